//! バイト列から整数・ビットフィールド・16進文字列を組み立てるヘルパー群
//!
//! ヘッダーのフィールドはすべてネットワークバイトオーダー(ビッグエンディアン)で
//! 格納されている。マシンワードに収まるフィールドは `be_u16` / `be_u32` で、
//! 幅が可変のもの(IPv4オプションなど)は `assemble_be` で `WideUint` に変換する。
//! ペイロードの16進文字列は `hex` クレートで作る。

use serde::{Serialize, Serializer};
use std::cmp::Ordering;
use std::fmt;

/// 任意幅の符号なし整数
///
/// 内部表現は先頭のゼロを取り除いたビッグエンディアンのバイト列。
/// 空のバイト列はゼロを表す。
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct WideUint {
    magnitude: Vec<u8>,
}

impl WideUint {
    pub fn zero() -> Self {
        Self::default()
    }

    pub fn is_zero(&self) -> bool {
        self.magnitude.is_empty()
    }

    /// 先頭ゼロを除いたビッグエンディアンのバイト列
    pub fn as_be_bytes(&self) -> &[u8] {
        &self.magnitude
    }

    /// 値を表すのに必要なビット数 (ゼロなら0)
    pub fn bit_len(&self) -> usize {
        match self.magnitude.first() {
            Some(&top) => (self.magnitude.len() - 1) * 8 + (8 - top.leading_zeros() as usize),
            None => 0,
        }
    }

    pub fn to_u64(&self) -> Option<u64> {
        if self.magnitude.len() > 8 {
            return None;
        }
        Some(be_fold(&self.magnitude) as u64)
    }

    pub fn to_u128(&self) -> Option<u128> {
        if self.magnitude.len() > 16 {
            return None;
        }
        Some(be_fold(&self.magnitude))
    }

    /// 10進数表記
    ///
    /// 256進数の桁列を10で割り続けて余りを集める。
    pub fn to_decimal_string(&self) -> String {
        if self.is_zero() {
            return "0".to_string();
        }

        let mut digits = Vec::new();
        let mut work = self.magnitude.clone();

        while !work.is_empty() {
            let mut remainder: u32 = 0;
            let mut quotient = Vec::with_capacity(work.len());
            for &byte in &work {
                let current = (remainder << 8) | u32::from(byte);
                let q = (current / 10) as u8;
                remainder = current % 10;
                if !(quotient.is_empty() && q == 0) {
                    quotient.push(q);
                }
            }
            digits.push(b'0' + remainder as u8);
            work = quotient;
        }

        digits.iter().rev().map(|&d| d as char).collect()
    }
}

impl From<u64> for WideUint {
    fn from(value: u64) -> Self {
        assemble_be(&value.to_be_bytes())
    }
}

impl From<u128> for WideUint {
    fn from(value: u128) -> Self {
        assemble_be(&value.to_be_bytes())
    }
}

impl PartialEq<u64> for WideUint {
    fn eq(&self, other: &u64) -> bool {
        self.to_u64() == Some(*other)
    }
}

impl PartialEq<u128> for WideUint {
    fn eq(&self, other: &u128) -> bool {
        self.to_u128() == Some(*other)
    }
}

impl Ord for WideUint {
    fn cmp(&self, other: &Self) -> Ordering {
        self.magnitude
            .len()
            .cmp(&other.magnitude.len())
            .then_with(|| self.magnitude.cmp(&other.magnitude))
    }
}

impl PartialOrd for WideUint {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for WideUint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad_integral(true, "", &self.to_decimal_string())
    }
}

impl fmt::LowerHex for WideUint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let digits = match self.magnitude.split_first() {
            Some((top, rest)) => format!("{:x}{}", top, hex::encode(rest)),
            None => "0".to_string(),
        };
        f.pad_integral(true, "0x", &digits)
    }
}

// JSONの数値は53ビットを超えると精度が落ちるため10進文字列で出力する
impl Serialize for WideUint {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// IntegerAssembler: バイト列をビッグエンディアンで連結した符号なし整数
///
/// 先頭バイトが最上位。空の入力はゼロ。幅の上限はない。
pub fn assemble_be(bytes: &[u8]) -> WideUint {
    let start = bytes.iter().position(|&b| b != 0).unwrap_or(bytes.len());
    WideUint {
        magnitude: bytes[start..].to_vec(),
    }
}

fn be_fold(bytes: &[u8]) -> u128 {
    bytes
        .iter()
        .fold(0u128, |acc, &byte| (acc << 8) | u128::from(byte))
}

/// 2バイト固定幅の `assemble_be`
pub fn be_u16(bytes: [u8; 2]) -> u16 {
    u16::from_be_bytes(bytes)
}

/// 4バイト固定幅の `assemble_be`
pub fn be_u32(bytes: [u8; 4]) -> u32 {
    u32::from_be_bytes(bytes)
}

// 0                   1
// 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5
// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
// |Version|  IHL  |
// +-+-+-+-+-+-+-+-+
// |Flags|      Fragment Offset    |
// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+

/// 上位4ビット (IPv4 バージョン)
pub fn high_nibble(byte: u8) -> u8 {
    (byte & 0xF0) >> 4
}

/// 下位4ビット (IPv4 IHL)
pub fn low_nibble(byte: u8) -> u8 {
    byte & 0x0F
}

/// 16ビットワードから `shift` ビット目を最下位として `width` ビットを取り出す
pub fn extract_bits(word: u16, shift: u32, width: u32) -> u16 {
    debug_assert!(width >= 1 && shift + width <= 16);
    let mask = ((1u32 << width) - 1) as u16;
    (word >> shift) & mask
}

/// フラグ: バイト6・7からなるワードのビット15..13
pub const IPV4_FLAGS_SHIFT: u32 = 13;
pub const IPV4_FLAGS_WIDTH: u32 = 3;
/// フラグメントオフセット: 同じワードのビット12..0
pub const IPV4_FRAGMENT_OFFSET_SHIFT: u32 = 0;
pub const IPV4_FRAGMENT_OFFSET_WIDTH: u32 = 13;

pub fn ipv4_flags(byte6: u8, byte7: u8) -> u8 {
    extract_bits(be_u16([byte6, byte7]), IPV4_FLAGS_SHIFT, IPV4_FLAGS_WIDTH) as u8
}

pub fn ipv4_fragment_offset(byte6: u8, byte7: u8) -> u16 {
    extract_bits(
        be_u16([byte6, byte7]),
        IPV4_FRAGMENT_OFFSET_SHIFT,
        IPV4_FRAGMENT_OFFSET_WIDTH,
    )
}
