use chrono::{Datelike, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::errors::{BorrowError, ValidationError};

/// 書籍ID - カタログの集約ID
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BookId(Uuid);

impl BookId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    pub fn value(&self) -> Uuid {
        self.0
    }
}

impl Default for BookId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for BookId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// 貸出取引ID - 台帳の1行（1回の貸出）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TransactionId(Uuid);

impl TransactionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    pub fn value(&self) -> Uuid {
        self.0
    }
}

impl Default for TransactionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for TransactionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// 利用者ID - 認証済みの借り手
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(Uuid);

impl UserId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    pub fn value(&self) -> Uuid {
        self.0
    }
}

impl Default for UserId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// 出版年の下限
pub const MIN_PUBLICATION_YEAR: i32 = 1000;

/// 現在年から許容する未来の年数
pub const PUBLICATION_YEAR_FUTURE_SLACK: i32 = 10;

/// 出版年
///
/// 不変条件：1000 <= 値 <= 現在年 + 10
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "i32", into = "i32")]
pub struct PublicationYear(i32);

impl PublicationYear {
    /// 基準年を指定して検証する
    pub fn new_at(value: i32, current_year: i32) -> Result<Self, ValidationError> {
        let max = current_year + PUBLICATION_YEAR_FUTURE_SLACK;
        if value < MIN_PUBLICATION_YEAR {
            return Err(ValidationError::new(
                "publicationYear",
                format!("Year must be at least {}", MIN_PUBLICATION_YEAR),
            ));
        }
        if value > max {
            return Err(ValidationError::new(
                "publicationYear",
                format!("Year cannot be later than {}", max),
            ));
        }
        Ok(Self(value))
    }

    pub fn value(&self) -> i32 {
        self.0
    }
}

impl TryFrom<i32> for PublicationYear {
    type Error = ValidationError;

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        Self::new_at(value, Utc::now().year())
    }
}

impl From<PublicationYear> for i32 {
    fn from(year: PublicationYear) -> Self {
        year.0
    }
}

/// 1タイトルあたりの登録可能な最大冊数
pub const MAX_QUANTITY: u32 = 1_000_000;

/// 貸出可能冊数
///
/// 不変条件：0以上。貸出で1減り、返却で1増える。
/// 0からの減算は型で拒否する（在庫切れ）。
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Quantity(u32);

impl Quantity {
    pub fn new(value: u32) -> Self {
        Self(value)
    }

    pub fn value(&self) -> u32 {
        self.0
    }

    pub fn is_available(&self) -> bool {
        self.0 > 0
    }

    /// 1冊貸し出す
    ///
    /// # エラー
    /// 残り0冊の場合は`BorrowError::OutOfStock`を返す
    pub fn decrement(self) -> Result<Self, BorrowError> {
        if self.0 == 0 {
            return Err(BorrowError::OutOfStock);
        }
        Ok(Self(self.0 - 1))
    }

    /// 1冊戻す
    pub fn increment(self) -> Self {
        Self(self.0.saturating_add(1))
    }
}

impl TryFrom<i32> for Quantity {
    type Error = ValidationError;

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        u32::try_from(value)
            .map(Self)
            .map_err(|_| ValidationError::new("quantity", "Quantity cannot be negative"))
    }
}

/// 登録時の入力値からの変換（0 ..= MAX_QUANTITY）
impl TryFrom<i64> for Quantity {
    type Error = ValidationError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        match u32::try_from(value) {
            Ok(v) if v <= MAX_QUANTITY => Ok(Self(v)),
            Ok(_) => Err(ValidationError::new(
                "quantity",
                format!("Quantity must be at most {}", MAX_QUANTITY),
            )),
            Err(_) => Err(ValidationError::new("quantity", "Quantity cannot be negative")),
        }
    }
}
