use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{BookId, BookPatch, UserId};

/// コマンド：書籍を借りる
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BorrowBook {
    pub book_id: BookId,
    pub user_id: UserId,
    pub borrowed_at: DateTime<Utc>,
}

/// コマンド：書籍を返却する
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReturnBook {
    pub book_id: BookId,
    pub user_id: UserId,
    pub returned_at: DateTime<Utc>,
}

/// コマンド：書籍を登録する
///
/// 値は未検証。検証はアプリケーション層で`BookDetails`に変換する際に行う。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateBook {
    pub title: String,
    pub author: String,
    pub isbn: String,
    pub publication_year: i32,
    pub quantity: Option<i64>,
    pub cover_image: Option<String>,
}

/// コマンド：書誌情報を更新する
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateBook {
    pub book_id: BookId,
    pub patch: BookPatch,
}
