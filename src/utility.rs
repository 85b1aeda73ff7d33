/// Byte offset of `$field` inside `$base`, for vertex attribute descriptions.
/// `$base` must be valid when zeroed.
#[macro_export]
macro_rules! offset_of {
    ($base:path, $field:ident) => {{
        #[allow(unused_unsafe)]
        unsafe {
            let b: $base = std::mem::zeroed();
            (std::ptr::addr_of!(b.$field) as isize - std::ptr::addr_of!(b) as isize) as u32
        }
    }};
}
