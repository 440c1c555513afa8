use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{BookId, PublicationYear, Quantity, ValidationError};

/// タイトルの最大文字数
pub const MAX_TITLE_LEN: usize = 255;
/// 著者名の最大文字数
pub const MAX_AUTHOR_LEN: usize = 255;
/// ISBNの最大文字数
pub const MAX_ISBN_LEN: usize = 50;
/// 表紙画像参照の最大文字数
pub const MAX_COVER_IMAGE_LEN: usize = 2048;

/// 新規登録時の既定の冊数
pub const DEFAULT_QUANTITY: u32 = 1;

/// Book集約 - カタログの1タイトル
///
/// `quantity`は貸出可能な冊数であり、貸出・返却でのみ変化する。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Book {
    pub id: BookId,
    pub title: String,
    pub author: String,
    pub isbn: String,
    pub publication_year: PublicationYear,
    pub quantity: Quantity,
    pub cover_image: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// 検証済みの書誌情報
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BookDetails {
    title: String,
    author: String,
    isbn: String,
    publication_year: PublicationYear,
    cover_image: Option<String>,
}

impl BookDetails {
    pub fn new(
        title: &str,
        author: &str,
        isbn: &str,
        publication_year: i32,
        cover_image: Option<&str>,
    ) -> Result<Self, ValidationError> {
        Ok(Self {
            title: validate_text("title", title, MAX_TITLE_LEN)?,
            author: validate_text("author", author, MAX_AUTHOR_LEN)?,
            isbn: validate_text("isbn", isbn, MAX_ISBN_LEN)?,
            publication_year: PublicationYear::try_from(publication_year)?,
            cover_image: cover_image.map(validate_cover_image).transpose()?.flatten(),
        })
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn author(&self) -> &str {
        &self.author
    }

    pub fn isbn(&self) -> &str {
        &self.isbn
    }

    pub fn publication_year(&self) -> PublicationYear {
        self.publication_year
    }

    pub fn cover_image(&self) -> Option<&str> {
        self.cover_image.as_deref()
    }
}

/// 書誌情報の部分更新
///
/// `None`のフィールドは変更しない。
/// `cover_image`は`Some(None)`で表紙を外す。
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BookPatch {
    pub title: Option<String>,
    pub author: Option<String>,
    pub isbn: Option<String>,
    pub publication_year: Option<i32>,
    pub cover_image: Option<Option<String>>,
}

impl BookPatch {
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.author.is_none()
            && self.isbn.is_none()
            && self.publication_year.is_none()
            && self.cover_image.is_none()
    }
}

fn validate_text(field: &'static str, value: &str, max_len: usize) -> Result<String, ValidationError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::new(field, format!("{} is required", field)));
    }
    if trimmed.chars().count() > max_len {
        return Err(ValidationError::new(
            field,
            format!("{} must be at most {} characters", field, max_len),
        ));
    }
    Ok(trimmed.to_string())
}

/// 空文字列は「表紙なし」として扱う
fn validate_cover_image(value: &str) -> Result<Option<String>, ValidationError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    if trimmed.chars().count() > MAX_COVER_IMAGE_LEN {
        return Err(ValidationError::new(
            "coverImage",
            format!("coverImage must be at most {} characters", MAX_COVER_IMAGE_LEN),
        ));
    }
    Ok(Some(trimmed.to_string()))
}

/// 純粋関数：書籍を登録する
pub fn create_book(details: BookDetails, quantity: Quantity, created_at: DateTime<Utc>) -> Book {
    Book {
        id: BookId::new(),
        title: details.title,
        author: details.author,
        isbn: details.isbn,
        publication_year: details.publication_year,
        quantity,
        cover_image: details.cover_image,
        created_at,
        updated_at: created_at,
    }
}

/// 純粋関数：書誌情報を更新する
///
/// 冊数は変更しない（貸出・返却のみが冊数を変える）。
pub fn update_book(
    book: &Book,
    patch: BookPatch,
    updated_at: DateTime<Utc>,
) -> Result<Book, ValidationError> {
    let title = match patch.title {
        Some(title) => validate_text("title", &title, MAX_TITLE_LEN)?,
        None => book.title.clone(),
    };
    let author = match patch.author {
        Some(author) => validate_text("author", &author, MAX_AUTHOR_LEN)?,
        None => book.author.clone(),
    };
    let isbn = match patch.isbn {
        Some(isbn) => validate_text("isbn", &isbn, MAX_ISBN_LEN)?,
        None => book.isbn.clone(),
    };
    let publication_year = match patch.publication_year {
        Some(year) => PublicationYear::try_from(year)?,
        None => book.publication_year,
    };
    let cover_image = match patch.cover_image {
        Some(Some(cover)) => validate_cover_image(&cover)?,
        Some(None) => None,
        None => book.cover_image.clone(),
    };

    Ok(Book {
        title,
        author,
        isbn,
        publication_year,
        cover_image,
        updated_at,
        ..book.clone()
    })
}

/// 検索語がタイトルまたは著者名に含まれるか（大文字小文字を区別しない）
pub fn matches_search(book: &Book, search: &str) -> bool {
    let needle = search.to_lowercase();
    book.title.to_lowercase().contains(&needle) || book.author.to_lowercase().contains(&needle)
}
