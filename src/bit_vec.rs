use num_traits::{PrimInt, Unsigned};

/// Fixed number of `N`-bit unsigned values packed into words of type `T`.
///
/// Values may straddle two adjacent words; one trailing word is kept so the
/// pair access never runs off the end.
#[derive(Clone, PartialEq, Eq)]
pub(crate) struct BitVec<T, const N: usize> {
    buf: Vec<T>,
    size: usize,
}

impl<T, const N: usize> BitVec<T, N>
where
    T: PrimInt + UnboundedShift + Unsigned,
{
    const WORD_SIZE: usize = 8 * size_of::<T>();
    const PACKED_LENGTH_OK: () = assert!(0 < N && N < Self::WORD_SIZE);

    pub fn new(size: usize) -> Self {
        // Add a binding to enforce a compile-time assertion.
        #[allow(clippy::let_unit_value)]
        let _ = Self::PACKED_LENGTH_OK;

        assert!(size > 0, "size must be > 0");
        let num_words = (N * size).div_ceil(Self::WORD_SIZE) + 1;

        Self {
            buf: vec![T::zero(); num_words],
            size,
        }
    }

    pub fn size(&self) -> usize {
        self.size
    }

    /// Largest value a single slot can hold.
    pub fn max_value() -> T {
        Self::lsb_mask()
    }

    pub fn iter(&self) -> impl Iterator<Item = T> + '_ {
        (0..self.size).map(move |index| {
            // SAFETY: `index` is bound by the size of vec
            unsafe { self.get_unchecked(index) }
        })
    }

    pub fn get(&self, index: usize) -> T {
        assert!(index < self.size, "index out of bounds");
        // SAFETY: just checked that `index` is in bounds
        unsafe { self.get_unchecked(index) }
    }

    pub fn set(&mut self, index: usize, value: T) {
        assert!(index < self.size, "index out of bounds");
        // SAFETY: just checked that `index` is in bounds
        unsafe { self.set_unchecked(index, value) }
    }

    /// Stores `max(current, value)` and reports whether the slot grew.
    pub fn update_max(&mut self, index: usize, value: T) -> bool {
        let value = value.min(Self::lsb_mask());
        if value > self.get(index) {
            self.set(index, value);
            true
        } else {
            false
        }
    }

    unsafe fn get_unchecked(&self, index: usize) -> T {
        let (word_index, offset) = Self::index_and_offset(index);
        let (first, second) = (
            *self.buf.get_unchecked(word_index),
            *self.buf.get_unchecked(word_index + 1),
        );
        let first_shifted = first >> offset;
        let second_shifted = second.ushl((Self::WORD_SIZE - offset) as u32);
        (first_shifted | second_shifted) & Self::lsb_mask()
    }

    unsafe fn set_unchecked(&mut self, index: usize, value: T) {
        let (word_index, offset) = Self::index_and_offset(index);
        let spill = (Self::WORD_SIZE - offset) as u32;
        let value_masked = value & Self::lsb_mask();
        {
            let first = self.buf.get_unchecked_mut(word_index);
            let first_cleared = *first & !(Self::lsb_mask() << offset);
            *first = first_cleared | (value_masked << offset);
        }
        let second = self.buf.get_unchecked_mut(word_index + 1);
        let second_cleared = *second & !Self::lsb_mask().ushr(spill);
        *second = second_cleared | value_masked.ushr(spill);
    }

    fn lsb_mask() -> T {
        (T::one() << N) - T::one()
    }

    fn index_and_offset(index: usize) -> (usize, usize) {
        (N * index / Self::WORD_SIZE, N * index % Self::WORD_SIZE)
    }
}

/// Shifts that yield zero instead of overflowing when `rhs` reaches the bit width.
pub(crate) trait UnboundedShift {
    fn ushl(self, rhs: u32) -> Self;
    fn ushr(self, rhs: u32) -> Self;
}

macro_rules! impl_unbounded_shift {
    ($t:ty) => {
        impl UnboundedShift for $t {
            fn ushl(self, rhs: u32) -> Self {
                self.unbounded_shl(rhs)
            }

            fn ushr(self, rhs: u32) -> Self {
                self.unbounded_shr(rhs)
            }
        }
    };
}

impl_unbounded_shift!(u8);
impl_unbounded_shift!(u16);
impl_unbounded_shift!(u32);
impl_unbounded_shift!(u64);
