//! Common Types Module
//!
//! 애플리케이션 전반에서 사용되는 공통 타입 정의

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// 참가비 차감 시 ledger에 기록되는 카테고리
pub const ENTRY_FEE_CATEGORY: &str = "Entry Fee";

/// 금액 타입 (paise 단위, 부호 있음)
///
/// ledger 항목은 음수가 될 수 있으므로 i64 사용.
/// 지갑 잔액은 항상 0 이상.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Amount(i64);

impl Amount {
    pub const ZERO: Amount = Amount(0);

    /// 소수점 자리수 (₹1 = 100 paise)
    pub const DECIMALS: u32 = 2;

    const SCALE: i64 = 100;

    pub const fn from_minor(minor: i64) -> Self {
        Self(minor)
    }

    pub const fn from_major(major: i64) -> Self {
        Self(major * Self::SCALE)
    }

    pub const fn minor(self) -> i64 {
        self.0
    }

    pub fn is_positive(self) -> bool {
        self.0 > 0
    }

    pub fn is_negative(self) -> bool {
        self.0 < 0
    }

    pub fn checked_add(self, other: Amount) -> Option<Amount> {
        self.0.checked_add(other.0).map(Amount)
    }

    pub fn checked_sub(self, other: Amount) -> Option<Amount> {
        self.0.checked_sub(other.0).map(Amount)
    }

    /// "150", "150.5", "150.50" 형태의 major 단위 문자열 파싱
    ///
    /// 음수, 지수 표기, 소수점 이하 3자리 이상은 거부
    pub fn parse_major(input: &str) -> Result<Amount, String> {
        let input = input.trim();
        if input.is_empty() {
            return Err("amount is empty".to_string());
        }

        let (whole, frac) = match input.split_once('.') {
            Some((w, f)) => (w, f),
            None => (input, ""),
        };

        if whole.is_empty() || !whole.chars().all(|c| c.is_ascii_digit()) {
            return Err(format!("invalid amount: {}", input));
        }
        if frac.len() > Self::DECIMALS as usize || !frac.chars().all(|c| c.is_ascii_digit()) {
            return Err(format!("invalid amount: {}", input));
        }

        let whole: i64 = whole
            .parse()
            .map_err(|_| format!("amount out of range: {}", input))?;
        let frac_minor: i64 = if frac.is_empty() {
            0
        } else {
            // "5" -> 50, "05" -> 5
            format!("{:0<2}", frac)
                .parse()
                .map_err(|_| format!("invalid amount: {}", input))?
        };

        whole
            .checked_mul(Self::SCALE)
            .and_then(|m| m.checked_add(frac_minor))
            .map(Amount)
            .ok_or_else(|| format!("amount out of range: {}", input))
    }
}

impl From<i64> for Amount {
    fn from(minor: i64) -> Self {
        Self(minor)
    }
}

impl std::ops::Neg for Amount {
    type Output = Amount;

    fn neg(self) -> Amount {
        Amount(-self.0)
    }
}

impl std::iter::Sum for Amount {
    fn sum<I: Iterator<Item = Amount>>(iter: I) -> Amount {
        Amount(iter.map(|a| a.0).sum())
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        write!(f, "{}₹{}.{:02}", sign, abs / 100, abs % 100)
    }
}

/// 문자열 enum 파싱 에러
#[derive(Debug, thiserror::Error)]
#[error("unknown {kind}: {value}")]
pub struct UnknownVariant {
    pub kind: &'static str,
    pub value: String,
}

/// 문자열로 저장되는 enum 보일러플레이트
///
/// DB에는 원래 문서 스토어와 같은 문자열("Upcoming", "Entry Fee" 등)로 저장됨
macro_rules! string_enum {
    ($name:ident, $kind:literal, { $($variant:ident => $text:literal),+ $(,)? }) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub enum $name {
            $(
                #[serde(rename = $text)]
                $variant,
            )+
        }

        impl $name {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $text,)+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = UnknownVariant;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($text => Ok($name::$variant),)+
                    other => Err(UnknownVariant {
                        kind: $kind,
                        value: other.to_string(),
                    }),
                }
            }
        }

        impl TryFrom<String> for $name {
            type Error = UnknownVariant;

            fn try_from(s: String) -> Result<Self, Self::Error> {
                s.parse()
            }
        }
    };
}

string_enum!(TournamentStatus, "tournament status", {
    Upcoming => "Upcoming",
    Live => "Live",
    Completed => "Completed",
    Cancelled => "Cancelled",
});

string_enum!(Role, "role", {
    User => "User",
    Admin => "Admin",
});

string_enum!(RequestKind, "request type", {
    Deposit => "Deposit",
    Withdrawal => "Withdrawal",
});

string_enum!(RequestStatus, "request status", {
    Pending => "Pending",
    Approved => "Approved",
    Declined => "Declined",
});

impl Default for TournamentStatus {
    fn default() -> Self {
        TournamentStatus::Upcoming
    }
}
