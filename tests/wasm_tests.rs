//! JavaScript facade, run under `wasm-pack test --node`.
#![cfg(target_arch = "wasm32")]
#![allow(clippy::unwrap_used, clippy::expect_used)]

use js_sys::{Array, Function};
use rtgrid::TableEditorHandle;
use wasm_bindgen::JsValue;
use wasm_bindgen_test::wasm_bindgen_test;

#[wasm_bindgen_test]
fn test_throwing_change_callback_does_not_fail_the_edit() {
    let mut handle = TableEditorHandle::new(JsValue::NULL, JsValue::NULL).unwrap();
    handle.set_change_callback(Some(Function::new_no_args(
        "throw new Error('listener failed')",
    )));

    let id = handle.insert_table(0, 2, 2, false).unwrap();
    assert!(!id.is_empty());
    assert_eq!(Array::from(&handle.tables().unwrap()).length(), 1);

    let undone = handle.undo().unwrap();
    assert!(!undone.is_null());
    assert_eq!(Array::from(&handle.tables().unwrap()).length(), 0);
}
