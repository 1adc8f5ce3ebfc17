//! Macros for ergonomic machine construction.

/// Build an [`ActionMap`](crate::builder::ActionMap) from `name => callback`
/// pairs.
///
/// # Example
///
/// ```
/// use nestfsm::actions;
/// use nestfsm::core::ContextOperator;
///
/// let actions = actions! {
///     "succeed" => |ctx: &mut dyn ContextOperator| {
///         ctx.put_result(true.into())?;
///         Ok(())
///     },
///     "noop" => |_: &mut dyn ContextOperator| Ok(()),
/// };
///
/// assert_eq!(actions.names(), vec!["noop", "succeed"]);
/// ```
#[macro_export]
macro_rules! actions {
    (
        $($name:expr => $func:expr),* $(,)?
    ) => {{
        #[allow(unused_mut)]
        let mut map = $crate::builder::ActionMap::new();
        $(
            map.insert($name, $func);
        )*
        map
    }};
}
