//! Composable text rendering for diagnostics.

/// Render an object into a shared buffer at a given indentation level.
pub trait Dump {
    fn dump(&self, buf: &mut String, level: usize);
}

/// Render an object into a fresh string.
pub fn dump_to_string(obj: &dyn Dump) -> String {
    let mut buf = String::new();
    obj.dump(&mut buf, 0);
    buf
}

pub(crate) fn indent(level: usize) -> String {
    "\t".repeat(level)
}
