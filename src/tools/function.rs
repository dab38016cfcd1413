use std::future::Future;

use async_trait::async_trait;
use futures_util::FutureExt;
use futures_util::future::BoxFuture;
use schemars::JsonSchema;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};

use crate::traits::{Tool, ToolContext, ToolError, ToolInfo};

type Handler = Box<dyn Fn(&str, ToolContext) -> BoxFuture<'static, Result<String, ToolError>> + Send + Sync>;

/// A tool backed by an async function over a typed, schema-described input.
pub struct FunctionTool {
    info: ToolInfo,
    handler: Handler,
}

/// JSON schema for `T` with the root-level `$schema`/`title` noise removed.
pub fn parameters_schema<T: JsonSchema>() -> Value {
    let schema = schemars::schema_for!(T);
    let mut value = serde_json::to_value(&schema).unwrap_or_else(|_| json!({"type": "object"}));
    if let Some(root) = value.as_object_mut() {
        root.remove("$schema");
        root.remove("title");
    }
    value
}

/// Build a tool whose parameter schema is inferred from `I`.
///
/// Arguments are decoded into `I`; the returned `O` is JSON-encoded.
pub fn infer_tool<I, O, F, Fut>(name: &str, description: &str, f: F) -> FunctionTool
where
    I: DeserializeOwned + JsonSchema + Send + 'static,
    O: Serialize + Send + 'static,
    F: Fn(I, ToolContext) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<O, ToolError>> + Send + 'static,
{
    let handler: Handler = Box::new(move |arguments, ctx| {
        let arguments = if arguments.trim().is_empty() { "{}" } else { arguments };
        match serde_json::from_str::<I>(arguments) {
            Ok(input) => {
                let fut = f(input, ctx);
                async move {
                    let output = fut.await?;
                    Ok::<_, ToolError>(serde_json::to_string(&output)?)
                }
                .boxed()
            }
            Err(err) => async move { Err(ToolError::from(err)) }.boxed(),
        }
    });

    FunctionTool {
        info: ToolInfo {
            name: name.to_string(),
            description: description.to_string(),
            parameters: parameters_schema::<I>(),
        },
        handler,
    }
}

#[async_trait]
impl Tool for FunctionTool {
    fn info(&self) -> ToolInfo {
        self.info.clone()
    }

    async fn invoke(&self, ctx: &ToolContext, arguments: &str) -> Result<String, ToolError> {
        (self.handler)(arguments, ctx.clone()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Deserialize, JsonSchema)]
    struct AddRequest {
        /// first addend
        a: f64,
        b: f64,
    }

    fn add_tool() -> FunctionTool {
        infer_tool("add", "add two numbers", |req: AddRequest, _ctx| async move {
            Ok::<_, ToolError>(req.a + req.b)
        })
    }

    #[test]
    fn schema_is_inferred_from_input() {
        let info = add_tool().info();
        assert_eq!(info.name, "add");
        assert_eq!(info.parameters["type"], "object");
        assert!(info.parameters["properties"]["a"].is_object());
        assert!(info.parameters.get("$schema").is_none());
        let required = info.parameters["required"].as_array().unwrap();
        assert_eq!(required.len(), 2);
    }

    #[tokio::test]
    async fn invoke_decodes_and_encodes() {
        let tool = add_tool();
        let out = tool.invoke(&ToolContext::default(), r#"{"a": 1.5, "b": 2}"#).await.unwrap();
        assert_eq!(out, "3.5");
    }

    #[tokio::test]
    async fn bad_arguments_are_reported() {
        let tool = add_tool();
        let err = tool.invoke(&ToolContext::default(), r#"{"a": "x"}"#).await.unwrap_err();
        assert!(matches!(err, ToolError::InvalidArguments(_)));
    }
}
