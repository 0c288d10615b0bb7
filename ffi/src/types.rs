//! `#[repr(C)]` types for the FFI boundary.
//!
//! # Design
//! Each type mirrors a core type but uses C-compatible representations:
//! `*mut c_char` instead of `String`, raw pointers instead of `Vec`, and
//! tagged enums with explicit discriminants. Conversion functions live here
//! to keep `lib.rs` focused on the `extern "C"` surface.

use std::ffi::{c_void, CString};
use std::os::raw::c_char;
use std::sync::{Arc, Mutex};

use chat_core::{ApiError, Conversation, HttpMethod, Item, ItemStore, StoreError};

/// Opaque handle to a `Conversation`. C callers receive a pointer to this
/// and pass it back into every `chat_*` function.
pub struct FfiChatClient {
    pub(crate) inner: Arc<Conversation>,
}

/// Opaque handle to an `ItemStore`.
pub struct FfiItemStore {
    pub(crate) inner: Mutex<ItemStore>,
}

/// Convert to a heap C string, dropping interior NUL bytes.
pub(crate) fn c_string(s: impl Into<Vec<u8>>) -> *mut c_char {
    let mut bytes = s.into();
    bytes.retain(|&b| b != 0);
    CString::new(bytes).unwrap_or_default().into_raw()
}

// ---------------------------------------------------------------------------
// Request types
// ---------------------------------------------------------------------------

/// HTTP method as a C enum.
#[repr(C)]
pub enum FfiHttpMethod {
    Get = 0,
    Post = 1,
    Put = 2,
    Delete = 3,
    Patch = 4,
}

impl From<HttpMethod> for FfiHttpMethod {
    fn from(m: HttpMethod) -> Self {
        match m {
            HttpMethod::Get => FfiHttpMethod::Get,
            HttpMethod::Post => FfiHttpMethod::Post,
            HttpMethod::Put => FfiHttpMethod::Put,
            HttpMethod::Delete => FfiHttpMethod::Delete,
            HttpMethod::Patch => FfiHttpMethod::Patch,
        }
    }
}

/// A single HTTP header as a key-value pair of C strings.
#[repr(C)]
pub struct FfiHeader {
    pub key: *mut c_char,
    pub value: *mut c_char,
}

/// An HTTP request described as C-compatible plain data.
///
/// Built by `chat_build_message`. The C caller executes the request
/// (honoring `timeout_secs`) and passes the response back through
/// `chat_parse_reply`.
#[repr(C)]
pub struct FfiHttpRequest {
    pub method: FfiHttpMethod,
    pub url: *mut c_char,
    pub headers: *mut FfiHeader,
    pub headers_len: u32,
    pub body: *mut c_char,
    pub timeout_secs: u64,
}

impl FfiHttpRequest {
    /// Convert a core `HttpRequest` into a heap-allocated `FfiHttpRequest`.
    pub(crate) fn from_core(req: chat_core::HttpRequest, timeout_secs: u64) -> *mut Self {
        let url = c_string(req.url);
        let body = match req.body {
            Some(b) => c_string(b),
            None => std::ptr::null_mut(),
        };

        let headers_len = req.headers.len() as u32;
        let headers = if req.headers.is_empty() {
            std::ptr::null_mut()
        } else {
            let ffi_headers: Box<[FfiHeader]> = req
                .headers
                .into_iter()
                .map(|(k, v)| FfiHeader {
                    key: c_string(k),
                    value: c_string(v),
                })
                .collect();
            Box::into_raw(ffi_headers) as *mut FfiHeader
        };

        Box::into_raw(Box::new(FfiHttpRequest {
            method: req.method.into(),
            url,
            headers,
            headers_len,
            body,
            timeout_secs,
        }))
    }
}

// ---------------------------------------------------------------------------
// Response input (caller-provided, not heap-allocated by us)
// ---------------------------------------------------------------------------

/// An HTTP response described as C-compatible plain data.
///
/// The C caller constructs this on the stack after executing an HTTP request,
/// then passes a pointer to `chat_parse_reply`. The FFI layer reads but does
/// not free these fields. Use `status = 0` when no status was received.
#[repr(C)]
pub struct FfiHttpResponse {
    pub status: u16,
    pub body: *const c_char,
}

// ---------------------------------------------------------------------------
// Result types
// ---------------------------------------------------------------------------

/// Error codes returned in `FfiResult`.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FfiErrorCode {
    Ok = 0,
    InvalidTarget = 1,
    Encoding = 2,
    Transport = 3,
    BadStatus = 4,
    EmptyPayload = 5,
    Decoding = 6,
    EmptyMessage = 7,
    InvalidResponseShape = 8,
    SendInProgress = 9,
    Store = 10,
    NotFound = 11,
    Panic = 12,
    NullArg = 13,
    InvalidArg = 14,
}

/// Tag that tells `chat_free_result` what `FfiResult::data` points to.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FfiDataTag {
    None = 0,
    /// `data` is a `char*` holding the reply text.
    Reply = 1,
    Item = 2,
    ItemList = 3,
}

/// A single stored item exposed to C. `content` may be null.
#[repr(C)]
pub struct FfiItem {
    pub id: *mut c_char,
    pub title: *mut c_char,
    pub content: *mut c_char,
    /// RFC 3339 timestamp.
    pub created_at: *mut c_char,
    pub created_at_unix: i64,
}

impl From<Item> for FfiItem {
    fn from(item: Item) -> Self {
        FfiItem {
            id: c_string(item.id.to_string()),
            title: c_string(item.title),
            content: item.content.map_or(std::ptr::null_mut(), c_string),
            created_at: c_string(item.created_at.to_rfc3339()),
            created_at_unix: item.created_at.timestamp(),
        }
    }
}

/// A list of items exposed to C, newest first.
#[repr(C)]
pub struct FfiItemList {
    pub items: *mut FfiItem,
    pub len: u32,
}

/// Result envelope for every fallible operation.
///
/// On success `error_code` is `Ok`, `error_message` is null, and `data`
/// points to the payload (tagged by `data_tag`).
/// On failure `error_code` describes the category, `error_message` is a
/// C string fit for display, and `data` is null.
#[repr(C)]
pub struct FfiResult {
    pub error_code: FfiErrorCode,
    pub error_message: *mut c_char,
    pub http_status: u16,
    pub data_tag: FfiDataTag,
    pub data: *mut c_void,
}

impl FfiResult {
    fn ok(data_tag: FfiDataTag, data: *mut c_void) -> *mut Self {
        Box::into_raw(Box::new(FfiResult {
            error_code: FfiErrorCode::Ok,
            error_message: std::ptr::null_mut(),
            http_status: 0,
            data_tag,
            data,
        }))
    }

    fn err(error_code: FfiErrorCode, http_status: u16, msg: impl Into<Vec<u8>>) -> *mut Self {
        Box::into_raw(Box::new(FfiResult {
            error_code,
            error_message: c_string(msg),
            http_status,
            data_tag: FfiDataTag::None,
            data: std::ptr::null_mut(),
        }))
    }

    /// Build a success result carrying the reply text.
    pub(crate) fn ok_reply(reply: String) -> *mut Self {
        Self::ok(FfiDataTag::Reply, c_string(reply) as *mut c_void)
    }

    /// Build a success result carrying a single `FfiItem`.
    pub(crate) fn ok_item(item: Item) -> *mut Self {
        let ffi_item = Box::new(FfiItem::from(item));
        Self::ok(FfiDataTag::Item, Box::into_raw(ffi_item) as *mut c_void)
    }

    /// Build a success result carrying a `FfiItemList`.
    pub(crate) fn ok_item_list(items: Vec<Item>) -> *mut Self {
        let len = items.len() as u32;
        let items = if items.is_empty() {
            std::ptr::null_mut()
        } else {
            let ffi_items: Box<[FfiItem]> = items.into_iter().map(FfiItem::from).collect();
            Box::into_raw(ffi_items) as *mut FfiItem
        };
        let ffi_list = Box::new(FfiItemList { items, len });
        Self::ok(FfiDataTag::ItemList, Box::into_raw(ffi_list) as *mut c_void)
    }

    /// Build a success result with no data payload (e.g. delete).
    pub(crate) fn ok_empty() -> *mut Self {
        Self::ok(FfiDataTag::None, std::ptr::null_mut())
    }

    /// Build an error result from an `ApiError`, carrying its user-facing
    /// message.
    pub(crate) fn from_error(err: ApiError) -> *mut Self {
        let code = match &err {
            ApiError::InvalidTarget(_) => FfiErrorCode::InvalidTarget,
            ApiError::EncodingFailed(_) => FfiErrorCode::Encoding,
            ApiError::TransportFailed(_) => FfiErrorCode::Transport,
            ApiError::BadStatus { .. } => FfiErrorCode::BadStatus,
            ApiError::EmptyPayload => FfiErrorCode::EmptyPayload,
            ApiError::DecodingFailed(_) => FfiErrorCode::Decoding,
            ApiError::EmptyMessage => FfiErrorCode::EmptyMessage,
            ApiError::InvalidResponseShape(_) => FfiErrorCode::InvalidResponseShape,
            ApiError::SendInProgress => FfiErrorCode::SendInProgress,
        };
        Self::err(code, err.status().unwrap_or(0), err.user_message())
    }

    /// Build an error result from a `StoreError`.
    pub(crate) fn from_store_error(err: StoreError) -> *mut Self {
        let code = match &err {
            StoreError::NotFound(_) => FfiErrorCode::NotFound,
            StoreError::EmptyTitle => FfiErrorCode::InvalidArg,
            StoreError::Io(_) | StoreError::Serde(_) => FfiErrorCode::Store,
        };
        Self::err(code, 0, err.to_string())
    }

    /// Build an error result for a null argument.
    pub(crate) fn null_arg(name: &str) -> *mut Self {
        Self::err(FfiErrorCode::NullArg, 0, format!("null argument: {name}"))
    }

    /// Build an error result for an argument that is not valid UTF-8 or not
    /// in the expected format.
    pub(crate) fn invalid_arg(name: &str) -> *mut Self {
        Self::err(FfiErrorCode::InvalidArg, 0, format!("invalid argument: {name}"))
    }

    /// Build an error result for a caught panic.
    pub(crate) fn panic(msg: &str) -> *mut Self {
        Self::err(FfiErrorCode::Panic, 0, msg)
    }
}
