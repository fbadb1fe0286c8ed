//! Native callbacks the DOM shim reaches back into.

use boa_engine::Context;
use boa_engine::JsResult;
use boa_engine::JsString;
use boa_engine::JsValue;
use boa_engine::js_string;
use boa_engine::native_function::NativeFunction;
use rv_html::HtmlParser;

/// `__pv_parse_fragment(markup)` returns the body-context parse of `markup`
/// as a JSON array of node snapshots.
fn parse_fragment_native(
    _this: &JsValue,
    args: &[JsValue],
    context: &mut Context,
) -> JsResult<JsValue> {
    let markup = match args.first() {
        Some(value) => value.to_string(context)?.to_std_string_escaped(),
        None => String::new(),
    };
    let nodes = HtmlParser.parse_fragment(&markup);
    let json = serde_json::to_string(&nodes).unwrap_or_else(|_| "[]".to_owned());
    Ok(JsValue::from(JsString::from(json.as_str())))
}

pub(crate) fn register(context: &mut Context) -> JsResult<()> {
    context.register_global_builtin_callable(
        js_string!("__pv_parse_fragment"),
        1,
        NativeFunction::from_fn_ptr(parse_fragment_native),
    )
}
