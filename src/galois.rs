//! Galois Field GF(2^8) arithmetic for HashTag coding
//!
//! Every coefficient in the codec lives in GF(2^8) generated by the primitive
//! polynomial 0x11D (x⁸ + x⁴ + x³ + x² + 1). Addition is XOR; multiplication and
//! division go through log/antilog tables built once per process.
//!
//! Byte slices are combined with [`mul_slice`] and [`mul_add_slice`], which read
//! a row of the full 256×256 product table so the inner loop is a single lookup.

use std::ops::{Add, AddAssign, Div, DivAssign, Mul, MulAssign, Sub, SubAssign};
use std::sync::OnceLock;

/// GF(2^8) primitive polynomial: 0x11D (x⁸ + x⁴ + x³ + x² + 1)
pub const GF8_GENERATOR: u32 = 0x11D;

const COUNT: usize = 256;
const LIMIT: usize = COUNT - 1;

/// Logarithm and antilogarithm tables for GF(2^8)
pub struct GaloisTable {
    pub log: [u8; COUNT],
    /// Twice the group order so `log a + log b` never needs a modulo
    pub antilog: [u8; 2 * LIMIT],
}

impl Default for GaloisTable {
    fn default() -> Self {
        Self::new()
    }
}

impl GaloisTable {
    pub fn new() -> Self {
        let mut table = GaloisTable {
            log: [0; COUNT],
            antilog: [0; 2 * LIMIT],
        };
        table.build_tables();
        table
    }

    fn build_tables(&mut self) {
        let mut b = 1u32;

        for l in 0..LIMIT {
            self.log[b as usize] = l as u8;
            self.antilog[l] = b as u8;
            self.antilog[l + LIMIT] = b as u8;

            b <<= 1;
            if b & COUNT as u32 != 0 {
                b ^= GF8_GENERATOR;
            }
        }

        // log(0) is undefined; callers short-circuit on zero before looking it up
        self.log[0] = 0;
    }
}

/// Full product table: `product[a][b] = a * b`
struct ProductTable {
    product: Box<[[u8; COUNT]; COUNT]>,
}

impl ProductTable {
    fn new(galois: &GaloisTable) -> Self {
        let mut product = Box::new([[0u8; COUNT]; COUNT]);
        for a in 1..COUNT {
            let log_a = galois.log[a] as usize;
            for b in 1..COUNT {
                product[a][b] = galois.antilog[log_a + galois.log[b] as usize];
            }
        }
        Self { product }
    }
}

static GALOIS_TABLE: OnceLock<GaloisTable> = OnceLock::new();
static PRODUCT_TABLE: OnceLock<ProductTable> = OnceLock::new();

#[inline]
fn galois_table() -> &'static GaloisTable {
    GALOIS_TABLE.get_or_init(GaloisTable::new)
}

#[inline]
fn product_table() -> &'static ProductTable {
    PRODUCT_TABLE.get_or_init(|| ProductTable::new(galois_table()))
}

/// Row of the product table for `coefficient`: `row[x] = coefficient * x`
#[inline]
pub fn mul_table(coefficient: Galois8) -> &'static [u8; COUNT] {
    &product_table().product[coefficient.value() as usize]
}

/// GF(2^8) element
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Galois8 {
    value: u8,
}

impl Galois8 {
    pub const ZERO: Self = Self { value: 0 };
    pub const ONE: Self = Self { value: 1 };

    #[inline]
    pub const fn new(value: u8) -> Self {
        Self { value }
    }

    #[inline]
    pub const fn value(&self) -> u8 {
        self.value
    }

    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.value == 0
    }

    /// Primitive element raised to `exponent`
    fn exp(exponent: usize) -> Self {
        Self::new(galois_table().antilog[exponent % LIMIT])
    }

    /// Discrete logarithm. Zero has no logarithm and maps to 0.
    pub fn log(&self) -> u8 {
        galois_table().log[self.value as usize]
    }

    /// Multiplicative inverse. Panics on zero.
    pub fn inverse(&self) -> Self {
        if self.value == 0 {
            panic!("Cannot invert zero in Galois field");
        }
        Self::exp(LIMIT - self.log() as usize)
    }
}

// Addition (XOR in Galois fields)
impl Add for Galois8 {
    type Output = Self;

    #[inline]
    fn add(self, rhs: Self) -> Self::Output {
        Self::new(self.value ^ rhs.value)
    }
}

impl AddAssign for Galois8 {
    #[inline]
    fn add_assign(&mut self, rhs: Self) {
        self.value ^= rhs.value;
    }
}

// Subtraction (same as addition in GF(2^n))
impl Sub for Galois8 {
    type Output = Self;

    #[inline]
    fn sub(self, rhs: Self) -> Self::Output {
        Self::new(self.value ^ rhs.value)
    }
}

impl SubAssign for Galois8 {
    #[inline]
    fn sub_assign(&mut self, rhs: Self) {
        self.value ^= rhs.value;
    }
}

impl Mul for Galois8 {
    type Output = Self;

    #[inline]
    fn mul(self, rhs: Self) -> Self::Output {
        Self::new(product_table().product[self.value as usize][rhs.value as usize])
    }
}

impl MulAssign for Galois8 {
    #[inline]
    fn mul_assign(&mut self, rhs: Self) {
        *self = *self * rhs;
    }
}

impl Div for Galois8 {
    type Output = Self;

    fn div(self, rhs: Self) -> Self::Output {
        if rhs.value == 0 {
            panic!("Division by zero in Galois field");
        }
        if self.value == 0 {
            return Self::ZERO;
        }
        let table = galois_table();
        let log_diff = table.log[self.value as usize] as usize + LIMIT
            - table.log[rhs.value as usize] as usize;
        Self::new(table.antilog[log_diff])
    }
}

impl DivAssign for Galois8 {
    fn div_assign(&mut self, rhs: Self) {
        *self = *self / rhs;
    }
}

impl From<u8> for Galois8 {
    fn from(value: u8) -> Self {
        Self::new(value)
    }
}

impl From<Galois8> for u8 {
    fn from(val: Galois8) -> Self {
        val.value
    }
}

impl std::fmt::Display for Galois8 {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.value)
    }
}

/// `output = coefficient * input`
#[inline]
pub fn mul_slice(coefficient: Galois8, input: &[u8], output: &mut [u8]) {
    debug_assert_eq!(input.len(), output.len());
    match coefficient.value() {
        0 => output.fill(0),
        1 => output.copy_from_slice(input),
        _ => {
            let row = mul_table(coefficient);
            for (out, &byte) in output.iter_mut().zip(input) {
                *out = row[byte as usize];
            }
        }
    }
}

/// `output ^= coefficient * input`
#[inline]
pub fn mul_add_slice(coefficient: Galois8, input: &[u8], output: &mut [u8]) {
    debug_assert_eq!(input.len(), output.len());
    match coefficient.value() {
        0 => {}
        1 => {
            for (out, &byte) in output.iter_mut().zip(input) {
                *out ^= byte;
            }
        }
        _ => {
            let row = mul_table(coefficient);
            for (out, &byte) in output.iter_mut().zip(input) {
                *out ^= row[byte as usize];
            }
        }
    }
}
