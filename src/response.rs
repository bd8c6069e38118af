//! Standard response envelope helpers.

use axum::{http::StatusCode, Json};
use serde::Serialize;

#[derive(Serialize)]
pub struct SuccessOne<T> {
    pub data: T,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta: Option<serde_json::Value>,
}

#[derive(Serialize)]
pub struct SuccessMany<T> {
    pub data: Vec<T>,
    pub meta: MetaCount,
}

#[derive(Serialize)]
pub struct MetaCount {
    pub count: u64,
}

#[derive(Serialize)]
pub struct SuccessPage<T> {
    pub data: Vec<T>,
    pub meta: MetaPage,
}

/// `count` is the total across all pages.
#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct MetaPage {
    pub count: u64,
    pub page: u32,
    pub page_size: u32,
    pub pages: u32,
}

impl MetaPage {
    pub fn new(count: u64, page: u32, page_size: u32) -> Self {
        let pages = if page_size == 0 {
            0
        } else {
            count.div_ceil(u64::from(page_size)) as u32
        };
        MetaPage {
            count,
            page,
            page_size,
            pages,
        }
    }
}

pub fn success_one<T: Serialize>(data: T) -> (StatusCode, Json<SuccessOne<T>>) {
    (
        StatusCode::CREATED,
        Json(SuccessOne {
            data,
            meta: None,
        }),
    )
}

pub fn success_one_ok<T: Serialize>(data: T) -> (StatusCode, Json<SuccessOne<T>>) {
    (
        StatusCode::OK,
        Json(SuccessOne {
            data,
            meta: None,
        }),
    )
}

pub fn success_many<T: Serialize>(data: Vec<T>) -> (StatusCode, Json<SuccessMany<T>>) {
    let count = data.len() as u64;
    (
        StatusCode::OK,
        Json(SuccessMany {
            data,
            meta: MetaCount { count },
        }),
    )
}

pub fn success_page<T: Serialize>(data: Vec<T>, meta: MetaPage) -> (StatusCode, Json<SuccessPage<T>>) {
    (StatusCode::OK, Json(SuccessPage { data, meta }))
}
