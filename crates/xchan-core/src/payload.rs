//! Marker trait for types that may live in the shared payload slot

/// Types that can be stored in a channel's payload slot.
///
/// # Safety
///
/// Implementors must guarantee:
/// - the type has a fixed memory layout (`#[repr(C)]` or a primitive),
/// - it contains no pointers, references, or other process-local handles,
/// - the all-zero bit pattern is a valid value (segments start zero-filled).
pub unsafe trait Payload: Copy + Send + Sync + 'static {}

macro_rules! impl_payload {
    ($($t:ty),* $(,)?) => {
        $(unsafe impl Payload for $t {})*
    };
}

impl_payload!(u8, u16, u32, u64, u128, usize);
impl_payload!(i8, i16, i32, i64, i128, isize);
impl_payload!(f32, f64, bool);

unsafe impl<T: Payload, const N: usize> Payload for [T; N] {}
