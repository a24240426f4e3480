use super::*;
use crate::content::ContentPart;
use crate::message::{ReasoningEcho, ToolCall};

fn user(text: &str) -> Vec<Message> {
    vec![Message::new(Role::User, text)]
}

fn weather_tool() -> ToolDefinition {
    ToolDefinition {
        name: "get_weather".to_string(),
        description: Some("Get weather".to_string()),
        parameters: serde_json::json!({
            "type": "object",
            "properties": {"location": {"type": "string"}}
        }),
    }
}

fn params(value: Value) -> Option<Map<String, Value>> {
    match value {
        Value::Object(map) => Some(map),
        _ => None,
    }
}

// -- Basic shape --

#[test]
fn test_minimal_payload() {
    let payload = build(&user("Hello"), &RequestOptions::default(), &ModelInfo::new("gpt-4o")).unwrap();
    let json = payload.as_value();

    assert_eq!(json["model"], "gpt-4o");
    assert_eq!(json["stream"], false);
    assert_eq!(json["messages"][0]["role"], "user");
    assert_eq!(json["messages"][0]["content"], "Hello");
    assert!(json.get("temperature").is_none());
    assert!(json.get("max_tokens").is_none());
    assert!(json.get("tools").is_none());
    assert!(json.get("tool_choice").is_none());
    assert!(json.get("response_format").is_none());
    assert!(!payload.is_streaming());
}

#[test]
fn test_system_message_prepended() {
    let options = RequestOptions {
        system_message: Some("You are a helpful assistant.".to_string()),
        stream: true,
        ..RequestOptions::default()
    };
    let payload = build(&user("Hello"), &options, &ModelInfo::new("gpt-4o")).unwrap();
    let json = payload.as_value();

    assert_eq!(json["messages"][0]["role"], "system");
    assert_eq!(json["messages"][0]["content"], "You are a helpful assistant.");
    assert_eq!(json["messages"][1]["role"], "user");
    assert!(payload.is_streaming());
}

#[test]
fn test_empty_system_message_skipped() {
    let options = RequestOptions {
        system_message: Some(String::new()),
        ..RequestOptions::default()
    };
    let payload = build(&user("Hello"), &options, &ModelInfo::new("gpt-4o")).unwrap();
    assert_eq!(payload.as_value()["messages"].as_array().unwrap().len(), 1);
}

// -- Model class --

#[test]
fn test_regular_model_fields() {
    let options = RequestOptions {
        temperature: Some(0.5),
        max_tokens: Some(1024),
        ..RequestOptions::default()
    };
    let payload = build(&user("Hi"), &options, &ModelInfo::new("gpt-4o")).unwrap();
    assert_eq!(payload.get("temperature").unwrap(), 0.5);
    assert_eq!(payload.get("max_tokens").unwrap(), 1024);
    assert!(payload.get("max_completion_tokens").is_none());
}

#[test]
fn test_reasoning_model_fields() {
    let options = RequestOptions {
        temperature: Some(0.5),
        max_tokens: Some(1024),
        ..RequestOptions::default()
    };
    for model in REASONING_MODELS {
        let payload = build(&user("Hi"), &options, &ModelInfo::new(*model)).unwrap();
        assert!(payload.get("temperature").is_none(), "{model}");
        assert!(payload.get("max_tokens").is_none(), "{model}");
        assert_eq!(payload.get("max_completion_tokens").unwrap(), 1024, "{model}");
    }
}

#[test]
fn test_reasoning_membership_is_exact() {
    assert!(is_reasoning_model("o3-mini"));
    assert!(!is_reasoning_model("o3-mini-2025-01-31"));
    assert!(!is_reasoning_model("gpt-4o"));
}

#[test]
fn test_reasoning_override() {
    let model = ModelInfo {
        reasoning: Some(true),
        ..ModelInfo::new("deepseek-reasoner")
    };
    assert!(model.is_reasoning());

    let model = ModelInfo {
        reasoning: Some(false),
        ..ModelInfo::new("o1")
    };
    assert!(!model.is_reasoning());
}

// -- Tools --

#[test]
fn test_tools_omitted_when_tool_use_off() {
    let options = RequestOptions {
        tools: vec![weather_tool()],
        ..RequestOptions::default()
    };
    let payload = build(&user("Hi"), &options, &ModelInfo::new("gpt-4o")).unwrap();
    assert!(payload.get("tools").is_none());
    assert!(payload.get("parallel_tool_calls").is_none());
}

#[test]
fn test_tools_omitted_without_definitions() {
    let options = RequestOptions {
        tool_use: ToolUse::Force,
        ..RequestOptions::default()
    };
    let payload = build(&user("Hi"), &options, &ModelInfo::new("gpt-4o")).unwrap();
    assert!(payload.get("tools").is_none());
    assert!(payload.get("tool_choice").is_none());
}

#[test]
fn test_tools_auto() {
    let options = RequestOptions {
        tool_use: ToolUse::Auto,
        tools: vec![weather_tool()],
        ..RequestOptions::default()
    };
    let payload = build(&user("What's the weather?"), &options, &ModelInfo::new("gpt-4o")).unwrap();
    let json = payload.as_value();

    assert_eq!(json["tools"][0]["type"], "function");
    assert_eq!(json["tools"][0]["function"]["name"], "get_weather");
    assert_eq!(json["tools"][0]["function"]["description"], "Get weather");
    assert_eq!(json["tools"][0]["function"]["parameters"]["type"], "object");
    assert!(json.get("tool_choice").is_none());
    assert_eq!(json["parallel_tool_calls"], true);
}

#[test]
fn test_tools_forced() {
    let options = RequestOptions {
        tool_use: ToolUse::Force,
        tools: vec![weather_tool()],
        ..RequestOptions::default()
    };
    let payload = build(&user("Hi"), &options, &ModelInfo::new("gpt-4o")).unwrap();
    assert_eq!(payload.get("tool_choice").unwrap(), "required");
}

#[test]
fn test_no_parallel_tool_calls_for_reasoning_models() {
    let options = RequestOptions {
        tool_use: ToolUse::Auto,
        tools: vec![weather_tool()],
        ..RequestOptions::default()
    };
    let payload = build(&user("Hi"), &options, &ModelInfo::new("o3")).unwrap();
    assert!(payload.get("tools").is_some());
    assert!(payload.get("parallel_tool_calls").is_none());
}

#[test]
fn test_tool_use_deserialization() {
    assert_eq!(serde_json::from_str::<ToolUse>("\"force\"").unwrap(), ToolUse::Force);
    assert_eq!(serde_json::from_str::<ToolUse>("\"off\"").unwrap(), ToolUse::Off);
}

// -- Structured output --

#[test]
fn test_response_format() {
    let schema = serde_json::json!({
        "type": "object",
        "properties": {"answer": {"type": "string"}},
        "required": ["answer"]
    });
    let options = RequestOptions {
        response_schema: Some(schema.clone()),
        ..RequestOptions::default()
    };
    let first = build(&user("Hi"), &options, &ModelInfo::new("gpt-4o")).unwrap();
    let second = build(&user("Hi"), &options, &ModelInfo::new("gpt-4o")).unwrap();

    let format = first.get("response_format").unwrap();
    assert_eq!(format["type"], "json_schema");
    assert_eq!(format["json_schema"]["schema"], schema);
    assert_eq!(format["json_schema"]["strict"], true);
    assert_ne!(
        format["json_schema"]["name"],
        second.get("response_format").unwrap()["json_schema"]["name"]
    );
}

// -- Parameter merging --

#[test]
fn test_params_merge_order() {
    let options = RequestOptions {
        temperature: Some(0.1),
        request_params: params(serde_json::json!({"top_p": 0.1, "seed": 1})),
        ..RequestOptions::default()
    };
    let model = ModelInfo {
        backend_params: params(serde_json::json!({"top_p": 0.5, "user": "backend"})),
        model_params: params(serde_json::json!({"top_p": 0.9, "temperature": 1.0})),
        ..ModelInfo::new("gpt-4o")
    };
    let payload = build(&user("Hi"), &options, &model).unwrap();

    assert_eq!(payload.get("top_p").unwrap(), 0.9);
    assert_eq!(payload.get("seed").unwrap(), 1);
    assert_eq!(payload.get("user").unwrap(), "backend");
    assert_eq!(payload.get("temperature").unwrap(), 1.0);
    assert_eq!(payload.get("model").unwrap(), "gpt-4o");
}

#[test]
fn test_params_merge_is_recursive() {
    let options = RequestOptions {
        request_params: params(serde_json::json!({
            "stream_options": {"include_usage": true},
            "metadata": {"a": 1, "nested": {"x": 1}}
        })),
        ..RequestOptions::default()
    };
    let model = ModelInfo {
        model_params: params(serde_json::json!({
            "metadata": {"b": 2, "nested": {"y": 2}}
        })),
        ..ModelInfo::new("gpt-4o")
    };
    let payload = build(&user("Hi"), &options, &model).unwrap();

    assert_eq!(payload.get("stream_options").unwrap()["include_usage"], true);
    assert_eq!(
        payload.get("metadata").unwrap(),
        &serde_json::json!({"a": 1, "b": 2, "nested": {"x": 1, "y": 2}})
    );
}

#[test]
fn test_merge_params_replaces_non_objects() {
    let mut base = serde_json::json!({"stop": ["a"], "opts": {"k": 1}});
    let overrides = params(serde_json::json!({"stop": ["b"], "opts": 3})).unwrap();
    merge_params(&mut base, &overrides);
    assert_eq!(base, serde_json::json!({"stop": ["b"], "opts": 3}));
}

// -- History conversion --

#[test]
fn test_tool_round_trip_messages() {
    let call = ToolCall {
        id: "call_1".to_string(),
        name: "get_weather".to_string(),
        arguments: serde_json::json!({"location": "London"}),
    };
    let history = vec![
        Message::new(Role::User, "What's the weather?"),
        Message::assistant_tool_calls(
            vec![call],
            Some(ReasoningEcho {
                field: ReasoningField::ReasoningContent,
                text: "Use the tool.".to_string(),
            }),
        ),
        Message::tool_result("call_1", "Sunny, 20C"),
    ];
    let payload = build(&history, &RequestOptions::default(), &ModelInfo::new("gpt-4o")).unwrap();
    let messages = &payload.as_value()["messages"];

    let assistant = &messages[1];
    assert_eq!(assistant["role"], "assistant");
    assert!(assistant["content"].is_null());
    assert_eq!(assistant["reasoning_content"], "Use the tool.");
    assert!(assistant.get("reasoning").is_none());
    assert_eq!(assistant["tool_calls"][0]["id"], "call_1");
    assert_eq!(assistant["tool_calls"][0]["type"], "function");
    assert_eq!(assistant["tool_calls"][0]["function"]["name"], "get_weather");
    let args: Value =
        serde_json::from_str(assistant["tool_calls"][0]["function"]["arguments"].as_str().unwrap())
            .unwrap();
    assert_eq!(args["location"], "London");

    let tool = &messages[2];
    assert_eq!(tool["role"], "tool");
    assert_eq!(tool["tool_call_id"], "call_1");
    assert_eq!(tool["content"], "Sunny, 20C");
}

#[test]
fn test_tool_ids_normalized_on_replay() {
    let history = vec![
        Message::assistant_tool_calls(
            vec![ToolCall {
                id: "toolu_01".to_string(),
                name: "f".to_string(),
                arguments: serde_json::json!({}),
            }],
            None,
        ),
        Message::tool_result("toolu_01", "done"),
        Message::tool_result("raw42", "done"),
    ];
    let payload = build(&history, &RequestOptions::default(), &ModelInfo::new("gpt-4o")).unwrap();
    let messages = &payload.as_value()["messages"];
    assert_eq!(messages[0]["tool_calls"][0]["id"], "toolu_01");
    assert_eq!(messages[1]["tool_call_id"], "toolu_01");
    assert_eq!(messages[2]["tool_call_id"], "call_raw42");
}

#[test]
fn test_multipart_user_turn() {
    let history = vec![Message::user_parts(vec![
        ContentPart::Text("### Describe this:".to_string()),
        ContentPart::Media {
            data: vec![0xff, 0xd8],
            mime: "image/jpeg".to_string(),
        },
    ])];
    let options = RequestOptions {
        trimmer: PrefixTrimmer::new(["###"]),
        ..RequestOptions::default()
    };
    let payload = build(&history, &options, &ModelInfo::new("gpt-4o")).unwrap();
    let content = &payload.as_value()["messages"][0]["content"];

    assert_eq!(content[0]["type"], "text");
    assert_eq!(content[0]["text"], "Describe this:");
    assert_eq!(content[1]["type"], "image_url");
    assert_eq!(content[1]["image_url"]["url"], "data:image/jpeg;base64,/9g=");
}

#[test]
fn test_unreadable_file_part_is_an_error() {
    let history = vec![Message::user_parts(vec![ContentPart::TextFile(
        "/nonexistent/chatwire/input.txt".into(),
    )])];
    let result = build(&history, &RequestOptions::default(), &ModelInfo::new("gpt-4o"));
    assert!(matches!(result, Err(RequestError::Content(_))));
}
