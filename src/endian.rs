use core::fmt::Debug;

pub trait Primitive: Copy + Clone + Default + Debug + PartialEq + PartialOrd + Sized {}

impl Primitive for u16 {}
impl Primitive for u32 {}
impl Primitive for u64 {}

#[derive(Copy, Clone, Default, Debug, PartialEq, PartialOrd)]
#[repr(transparent)]
pub struct Little<T: Primitive>(T);

#[derive(Copy, Clone, Default, Debug, PartialEq, PartialOrd)]
#[repr(transparent)]
pub struct Big<T: Primitive>(T);

/// ISO 9660 both-byte-order field, little-endian copy first
#[derive(Copy, Clone, Default, Debug, PartialEq)]
#[repr(C)]
pub struct Both<T: Primitive> {
    little: Little<T>,
    big: Big<T>,
}

macro_rules! define {
    ($type:ty) => {
        impl Little<$type> {
            pub fn to_ne(self) -> $type {
                <$type>::from_le(self.0)
            }
        }

        impl From<$type> for Little<$type> {
            #[inline]
            fn from(t: $type) -> Self {
                Self(<$type>::to_le(t))
            }
        }

        impl core::ops::Add<$type> for Little<$type> {
            type Output = $type;
            #[inline]
            fn add(self, rhs: $type) -> $type {
                <$type>::from_le(self.0) + rhs
            }
        }

        impl Big<$type> {
            pub fn to_ne(self) -> $type {
                <$type>::from_be(self.0)
            }
        }

        impl From<$type> for Big<$type> {
            #[inline]
            fn from(t: $type) -> Self {
                Self(<$type>::to_be(t))
            }
        }

        #[cfg(test)]
        impl Both<$type> {
            /// Little-endian copy, the one readers are expected to use
            pub fn to_ne(self) -> $type {
                self.little.to_ne()
            }
        }

        impl From<$type> for Both<$type> {
            #[inline]
            fn from(t: $type) -> Self {
                Self { little: t.into(), big: t.into() }
            }
        }
    };
}

define!(u16);
define!(u32);
define!(u64);

#[cfg(test)]
mod test {
    use super::{Big, Both, Little};

    #[test]
    fn test_byte_order() {
        let little: [u8; 4] = unsafe { core::mem::transmute(Little::from(0x12345678u32)) };
        assert_eq!(little, [0x78, 0x56, 0x34, 0x12]);
        let big: [u8; 4] = unsafe { core::mem::transmute(Big::from(0x12345678u32)) };
        assert_eq!(big, [0x12, 0x34, 0x56, 0x78]);
        let both: [u8; 4] = unsafe { core::mem::transmute(Both::from(0x0800u16)) };
        assert_eq!(both, [0x00, 0x08, 0x08, 0x00]);
        let both: [u8; 8] = unsafe { core::mem::transmute(Both::from(2048u32)) };
        assert_eq!(both, [0x00, 0x08, 0, 0, 0, 0, 0x08, 0x00]);
    }
}
