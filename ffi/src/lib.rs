//! C-ABI wrapper around `chat-core`.
//!
//! # Overview
//! Exposes the chat send pipeline and the local item store through
//! `extern "C"` functions so a mobile host can drive them through its C FFI.
//! Hosts with their own networking use `chat_build_message` /
//! `chat_parse_reply`; everyone else calls `chat_send` on a worker thread or
//! `chat_send_async` with a completion callback.
//!
//! # Design
//! - Every `extern "C"` function wraps its body in `catch_unwind` so panics
//!   never cross the FFI boundary.
//! - A single `FfiResult` envelope with `FfiDataTag` + `void* data`
//!   conveys success payloads and errors uniformly.
//! - The C caller owns all returned pointers and must call the matching
//!   `*_free*` function to release them.

pub mod types;

use std::ffi::{c_void, CStr, CString};
use std::os::raw::c_char;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Arc, Mutex};

use chat_core::{ChatClient, ChatConfig, Conversation, HttpResponse, ItemStore};

use types::*;

/// Completion callback for `chat_send_async`. Receives ownership of
/// `result` and must release it with `chat_free_result`.
pub type FfiSendCallback = extern "C" fn(result: *mut FfiResult, user_data: *mut c_void);

/// Borrow a C string as UTF-8. `None` for null or invalid UTF-8.
///
/// # Safety
/// `ptr` must be null or point to a NUL-terminated string that outlives `'a`.
unsafe fn read_str<'a>(ptr: *const c_char) -> Option<&'a str> {
    if ptr.is_null() {
        return None;
    }
    unsafe { CStr::from_ptr(ptr) }.to_str().ok()
}

/// Install the tracing subscriber (filtered by `RUST_LOG`). Returns false if
/// logging was already initialized.
#[unsafe(no_mangle)]
pub extern "C" fn chat_init_logging() -> bool {
    catch_unwind(chat_core::logging::init).unwrap_or(false)
}

// ---------------------------------------------------------------------------
// Client lifecycle
// ---------------------------------------------------------------------------

fn new_client(config: ChatConfig) -> *mut FfiChatClient {
    let conversation = Conversation::new(ChatClient::new(config));
    Box::into_raw(Box::new(FfiChatClient {
        inner: Arc::new(conversation),
    }))
}

/// Create a chat client bound to `base_url`, with every other setting at
/// its default.
///
/// Returns null if `base_url` is null or if an internal panic occurs.
/// The caller must free the returned pointer with `chat_client_free`.
#[unsafe(no_mangle)]
pub extern "C" fn chat_client_new(base_url: *const c_char) -> *mut FfiChatClient {
    catch_unwind(|| {
        let Some(url) = (unsafe { read_str(base_url) }) else {
            return std::ptr::null_mut();
        };
        new_client(ChatConfig::with_base_url(url))
    })
    .unwrap_or(std::ptr::null_mut())
}

/// Create a chat client from a JSON config object. Missing fields take
/// their defaults, e.g. `{"base_url":"https://x.ngrok-free.app"}`.
///
/// Returns null if `config_json` is null or not a valid config.
#[unsafe(no_mangle)]
pub extern "C" fn chat_client_new_with_config(config_json: *const c_char) -> *mut FfiChatClient {
    catch_unwind(|| {
        let Some(raw) = (unsafe { read_str(config_json) }) else {
            return std::ptr::null_mut();
        };
        match ChatConfig::from_json(raw) {
            Ok(config) => new_client(config),
            Err(e) => {
                tracing::warn!(error = %e, "rejected chat client config");
                std::ptr::null_mut()
            }
        }
    })
    .unwrap_or(std::ptr::null_mut())
}

/// Create a chat client on top of the process-wide shared client, which is
/// configured from the `CHAT_*` environment variables on first use. Every
/// handle created this way reuses the same connection pool.
///
/// The caller must free the returned pointer with `chat_client_free`.
#[unsafe(no_mangle)]
pub extern "C" fn chat_client_new_shared() -> *mut FfiChatClient {
    catch_unwind(|| {
        let conversation = Conversation::new(ChatClient::global().clone());
        Box::into_raw(Box::new(FfiChatClient {
            inner: Arc::new(conversation),
        }))
    })
    .unwrap_or(std::ptr::null_mut())
}

/// Free a client created by `chat_client_new*`. Safe to call with null.
///
/// A send started with `chat_send_async` keeps its own reference and
/// completes normally after this call.
#[unsafe(no_mangle)]
pub extern "C" fn chat_client_free(client: *mut FfiChatClient) {
    if !client.is_null() {
        let _ = catch_unwind(AssertUnwindSafe(|| {
            drop(unsafe { Box::from_raw(client) });
        }));
    }
}

// ---------------------------------------------------------------------------
// Host-does-IO
// ---------------------------------------------------------------------------

/// Build the chat completion request for `text`.
///
/// Returns null if `client` or `text` is null, if `text` is blank or not
/// UTF-8, or if the configured base URL is invalid.
/// The caller must free the returned pointer with `chat_free_request`.
#[unsafe(no_mangle)]
pub extern "C" fn chat_build_message(
    client: *const FfiChatClient,
    text: *const c_char,
) -> *mut FfiHttpRequest {
    catch_unwind(AssertUnwindSafe(|| {
        if client.is_null() {
            return std::ptr::null_mut();
        }
        let Some(text) = (unsafe { read_str(text) }) else {
            return std::ptr::null_mut();
        };
        let chat = unsafe { &*client }.inner.client();
        match chat.build_chat(text) {
            Ok(req) => FfiHttpRequest::from_core(req, chat.config().timeout_secs),
            Err(e) => {
                tracing::debug!(error = %e, "chat_build_message failed");
                std::ptr::null_mut()
            }
        }
    }))
    .unwrap_or(std::ptr::null_mut())
}

/// Convert an `FfiHttpResponse` to a core `HttpResponse`. A null body is
/// treated as empty.
fn ffi_response_to_core(resp: &FfiHttpResponse) -> HttpResponse {
    let body = if resp.body.is_null() {
        String::new()
    } else {
        unsafe { CStr::from_ptr(resp.body) }
            .to_string_lossy()
            .into_owned()
    };
    HttpResponse {
        status: resp.status,
        headers: Vec::new(),
        body,
    }
}

/// Parse the response to a request built by `chat_build_message`.
///
/// Returns a result with `data_tag = Reply` on success. Does not touch the
/// client's stored reply/error.
#[unsafe(no_mangle)]
pub extern "C" fn chat_parse_reply(
    client: *const FfiChatClient,
    response: *const FfiHttpResponse,
) -> *mut FfiResult {
    catch_unwind(AssertUnwindSafe(|| {
        if client.is_null() {
            return FfiResult::null_arg("client");
        }
        if response.is_null() {
            return FfiResult::null_arg("response");
        }
        let client = unsafe { &*client };
        let resp = unsafe { &*response };
        match client.inner.client().parse_reply(ffi_response_to_core(resp)) {
            Ok(reply) => FfiResult::ok_reply(reply),
            Err(e) => FfiResult::from_error(e),
        }
    }))
    .unwrap_or_else(|_| FfiResult::panic("panic in chat_parse_reply"))
}

// ---------------------------------------------------------------------------
// Send
// ---------------------------------------------------------------------------

fn send_result(conversation: &Conversation, text: &str) -> *mut FfiResult {
    match conversation.try_send(text) {
        Ok(reply) => FfiResult::ok_reply(reply),
        Err(e) => FfiResult::from_error(e),
    }
}

/// Send `text` and block until the reply arrives or the request fails.
/// Call from a background thread.
///
/// Returns a result with `data_tag = Reply` on success, otherwise an error
/// code and a message ready for display.
#[unsafe(no_mangle)]
pub extern "C" fn chat_send(client: *const FfiChatClient, text: *const c_char) -> *mut FfiResult {
    catch_unwind(AssertUnwindSafe(|| {
        if client.is_null() {
            return FfiResult::null_arg("client");
        }
        if text.is_null() {
            return FfiResult::null_arg("text");
        }
        let Some(text) = (unsafe { read_str(text) }) else {
            return FfiResult::invalid_arg("text");
        };
        send_result(&unsafe { &*client }.inner, text)
    }))
    .unwrap_or_else(|_| FfiResult::panic("panic in chat_send"))
}

/// Raw `user_data` pointer carried to the worker thread. The host promises
/// it is safe to use from there.
struct UserData(*mut c_void);

unsafe impl Send for UserData {}

impl UserData {
    fn into_inner(self) -> *mut c_void {
        self.0
    }
}

/// Send `text` on a background thread and invoke `callback` with the result
/// (on that thread) when done. The callback owns the result.
///
/// Returns false, without invoking `callback`, if an argument is null,
/// `text` is not UTF-8, or the thread could not be started.
#[unsafe(no_mangle)]
pub extern "C" fn chat_send_async(
    client: *const FfiChatClient,
    text: *const c_char,
    callback: Option<FfiSendCallback>,
    user_data: *mut c_void,
) -> bool {
    catch_unwind(AssertUnwindSafe(|| {
        let Some(callback) = callback else {
            return false;
        };
        if client.is_null() {
            return false;
        }
        let Some(text) = (unsafe { read_str(text) }).map(str::to_owned) else {
            return false;
        };
        let conversation = Arc::clone(&unsafe { &*client }.inner);
        let user_data = UserData(user_data);

        let spawned = std::thread::Builder::new()
            .name("chat-send".to_string())
            .spawn(move || {
                let result = catch_unwind(AssertUnwindSafe(|| send_result(&conversation, &text)))
                    .unwrap_or_else(|_| FfiResult::panic("panic in chat_send_async"));
                callback(result, user_data.into_inner());
            });
        match spawned {
            Ok(_) => true,
            Err(e) => {
                tracing::warn!(error = %e, "could not start send thread");
                false
            }
        }
    }))
    .unwrap_or(false)
}

/// Whether a send is outstanding on `client`. False for null.
#[unsafe(no_mangle)]
pub extern "C" fn chat_is_loading(client: *const FfiChatClient) -> bool {
    if client.is_null() {
        return false;
    }
    catch_unwind(AssertUnwindSafe(|| unsafe { &*client }.inner.is_loading())).unwrap_or(false)
}

/// Reset the stored reply and error. No network effect. Safe with null.
#[unsafe(no_mangle)]
pub extern "C" fn chat_clear(client: *const FfiChatClient) {
    if client.is_null() {
        return;
    }
    let _ = catch_unwind(AssertUnwindSafe(|| unsafe { &*client }.inner.clear()));
}

/// The last successful reply, or null. Free with `chat_free_string`.
#[unsafe(no_mangle)]
pub extern "C" fn chat_last_reply(client: *const FfiChatClient) -> *mut c_char {
    if client.is_null() {
        return std::ptr::null_mut();
    }
    catch_unwind(AssertUnwindSafe(|| {
        unsafe { &*client }
            .inner
            .last_reply()
            .map_or(std::ptr::null_mut(), c_string)
    }))
    .unwrap_or(std::ptr::null_mut())
}

/// The last error message, or null. Free with `chat_free_string`.
#[unsafe(no_mangle)]
pub extern "C" fn chat_last_error(client: *const FfiChatClient) -> *mut c_char {
    if client.is_null() {
        return std::ptr::null_mut();
    }
    catch_unwind(AssertUnwindSafe(|| {
        unsafe { &*client }
            .inner
            .last_error()
            .map_or(std::ptr::null_mut(), c_string)
    }))
    .unwrap_or(std::ptr::null_mut())
}

// ---------------------------------------------------------------------------
// Item store
// ---------------------------------------------------------------------------

fn new_store(store: ItemStore) -> *mut FfiItemStore {
    Box::into_raw(Box::new(FfiItemStore {
        inner: Mutex::new(store),
    }))
}

fn with_store<T>(store: *const FfiItemStore, f: impl FnOnce(&mut ItemStore) -> T) -> T {
    let store = unsafe { &*store };
    let mut guard = store.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
    f(&mut guard)
}

/// Open the item store persisted at `path` (created on first write).
///
/// Returns null if `path` is null or the file exists but cannot be read.
/// The caller must free the returned pointer with `items_free`.
#[unsafe(no_mangle)]
pub extern "C" fn items_open(path: *const c_char) -> *mut FfiItemStore {
    catch_unwind(|| {
        let Some(path) = (unsafe { read_str(path) }) else {
            return std::ptr::null_mut();
        };
        match ItemStore::open(path) {
            Ok(store) => new_store(store),
            Err(e) => {
                tracing::warn!(%path, error = %e, "could not open item store");
                std::ptr::null_mut()
            }
        }
    })
    .unwrap_or(std::ptr::null_mut())
}

/// Open a store that lives only in memory.
#[unsafe(no_mangle)]
pub extern "C" fn items_open_in_memory() -> *mut FfiItemStore {
    catch_unwind(|| new_store(ItemStore::in_memory())).unwrap_or(std::ptr::null_mut())
}

/// Free a store opened by `items_open*`. Safe to call with null.
#[unsafe(no_mangle)]
pub extern "C" fn items_free(store: *mut FfiItemStore) {
    if !store.is_null() {
        let _ = catch_unwind(AssertUnwindSafe(|| {
            drop(unsafe { Box::from_raw(store) });
        }));
    }
}

/// Create an item. `content` may be null.
///
/// Returns a result with `data_tag = Item` on success.
#[unsafe(no_mangle)]
pub extern "C" fn items_create(
    store: *const FfiItemStore,
    title: *const c_char,
    content: *const c_char,
) -> *mut FfiResult {
    catch_unwind(AssertUnwindSafe(|| {
        if store.is_null() {
            return FfiResult::null_arg("store");
        }
        if title.is_null() {
            return FfiResult::null_arg("title");
        }
        let Some(title) = (unsafe { read_str(title) }) else {
            return FfiResult::invalid_arg("title");
        };
        let content = unsafe { read_str(content) };
        match with_store(store, |s| s.create(title, content)) {
            Ok(item) => FfiResult::ok_item(item),
            Err(e) => FfiResult::from_store_error(e),
        }
    }))
    .unwrap_or_else(|_| FfiResult::panic("panic in items_create"))
}

/// List all items, newest first.
///
/// Returns a result with `data_tag = ItemList`.
#[unsafe(no_mangle)]
pub extern "C" fn items_list(store: *const FfiItemStore) -> *mut FfiResult {
    catch_unwind(AssertUnwindSafe(|| {
        if store.is_null() {
            return FfiResult::null_arg("store");
        }
        FfiResult::ok_item_list(with_store(store, |s| s.list()))
    }))
    .unwrap_or_else(|_| FfiResult::panic("panic in items_list"))
}

/// Delete the item with `id` (UUID string).
///
/// Returns a result with `data_tag = None` on success.
#[unsafe(no_mangle)]
pub extern "C" fn items_delete(store: *const FfiItemStore, id: *const c_char) -> *mut FfiResult {
    catch_unwind(AssertUnwindSafe(|| {
        if store.is_null() {
            return FfiResult::null_arg("store");
        }
        if id.is_null() {
            return FfiResult::null_arg("id");
        }
        let Some(id) = (unsafe { read_str(id) }).and_then(|s| uuid::Uuid::parse_str(s).ok()) else {
            return FfiResult::invalid_arg("id");
        };
        match with_store(store, |s| s.delete(id)) {
            Ok(()) => FfiResult::ok_empty(),
            Err(e) => FfiResult::from_store_error(e),
        }
    }))
    .unwrap_or_else(|_| FfiResult::panic("panic in items_delete"))
}

// ---------------------------------------------------------------------------
// Free functions
// ---------------------------------------------------------------------------

/// Free an `FfiHttpRequest` returned by `chat_build_message`.
/// Safe to call with null.
#[unsafe(no_mangle)]
pub extern "C" fn chat_free_request(req: *mut FfiHttpRequest) {
    if req.is_null() {
        return;
    }
    let _ = catch_unwind(|| {
        let req = unsafe { Box::from_raw(req) };
        free_c_string(req.url);
        free_c_string(req.body);
        if !req.headers.is_null() && req.headers_len > 0 {
            let headers = unsafe {
                Box::from_raw(std::ptr::slice_from_raw_parts_mut(
                    req.headers,
                    req.headers_len as usize,
                ))
            };
            for h in headers.iter() {
                free_c_string(h.key);
                free_c_string(h.value);
            }
        }
    });
}

/// Free an `FfiResult` returned by any result-producing function.
/// Safe to call with null. Uses `data_tag` to determine what `data` points to.
#[unsafe(no_mangle)]
pub extern "C" fn chat_free_result(result: *mut FfiResult) {
    if result.is_null() {
        return;
    }
    let _ = catch_unwind(|| {
        let result = unsafe { Box::from_raw(result) };
        free_c_string(result.error_message);
        if !result.data.is_null() {
            match result.data_tag {
                FfiDataTag::Reply => free_c_string(result.data as *mut c_char),
                FfiDataTag::Item => {
                    let item = unsafe { Box::from_raw(result.data as *mut FfiItem) };
                    free_ffi_item_fields(&item);
                }
                FfiDataTag::ItemList => {
                    let list = unsafe { Box::from_raw(result.data as *mut FfiItemList) };
                    if !list.items.is_null() && list.len > 0 {
                        let items = unsafe {
                            Box::from_raw(std::ptr::slice_from_raw_parts_mut(
                                list.items,
                                list.len as usize,
                            ))
                        };
                        for item in items.iter() {
                            free_ffi_item_fields(item);
                        }
                    }
                }
                FfiDataTag::None => {}
            }
        }
    });
}

fn free_c_string(s: *mut c_char) {
    if !s.is_null() {
        drop(unsafe { CString::from_raw(s) });
    }
}

/// Free the C-string fields of an `FfiItem` (but not the struct itself).
fn free_ffi_item_fields(item: &FfiItem) {
    free_c_string(item.id);
    free_c_string(item.title);
    free_c_string(item.content);
    free_c_string(item.created_at);
}

/// Free a C string allocated by this library. Safe to call with null.
#[unsafe(no_mangle)]
pub extern "C" fn chat_free_string(s: *mut c_char) {
    if !s.is_null() {
        let _ = catch_unwind(|| free_c_string(s));
    }
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
