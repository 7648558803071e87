//! Cassettes shared by the end-to-end tests
//!
//! Each one uses a different `duration` spelling, so loading them all also
//! covers the accepted duration formats. Requests carry the `Accept` header
//! reqwest sends by default.

/// Chat request stored with keys in a different order than clients send them
pub const CHAT_BASIC: &str = r#"---
version: 2
interactions:
    - id: 0
      request:
        proto: HTTP/1.1
        content_length: 63
        host: api.openai.com
        body: |-
            {
              "messages": [
                {
                  "content": "Hello!",
                  "role": "user"
                }
              ],
              "model": "m"
            }
        headers:
            Accept:
                - '*/*'
            Content-Type:
                - application/json
        url: https://api.openai.com/v1/chat/completions
        method: POST
      response:
        proto: HTTP/2.0
        content_length: -1
        body: '{"id":"chatcmpl-basic","object":"chat.completion","choices":[{"index":0,"message":{"role":"assistant","content":"Hi there!"},"finish_reason":"stop"}]}'
        headers:
            Content-Type:
                - application/json
            X-Request-Id:
                - req_basic
        status: 200 OK
        code: 200
        duration: 1.5s
"#;

/// Streamed chat completion ending with a usage chunk
pub const CHAT_STREAMING: &str = r#"---
version: 2
interactions:
    - id: 0
      request:
        body: '{"model":"gpt-4o-mini","messages":[{"role":"user","content":"Count to 3"}],"stream":true}'
        headers:
            Accept:
                - '*/*'
            Content-Type:
                - application/json
        url: https://api.openai.com/v1/chat/completions
        method: POST
      response:
        body: "data: {\"id\":\"c1\",\"choices\":[{\"index\":0,\"delta\":{\"role\":\"assistant\",\"content\":\"\"}}]}\n\ndata: {\"id\":\"c1\",\"choices\":[{\"index\":0,\"delta\":{\"content\":\"1, 2\"}}]}\n\ndata: {\"id\":\"c1\",\"choices\":[{\"index\":0,\"delta\":{\"content\":\", 3\"},\"finish_reason\":\"stop\"}]}\n\ndata: {\"id\":\"c1\",\"choices\":[],\"usage\":{\"prompt_tokens\":11,\"completion_tokens\":5,\"total_tokens\":16}}\n\ndata: [DONE]\n\n"
        headers:
            Content-Type:
                - text/event-stream
        status: 200 OK
        code: 200
        duration: 500ms
"#;

/// Embeddings with the duration stored as integer nanoseconds
pub const EMBEDDINGS: &str = r#"---
version: 2
interactions:
    - id: 0
      request:
        body: '{"model":"text-embedding-3-small","input":"hello"}'
        headers:
            Accept:
                - '*/*'
            Content-Type:
                - application/json
        url: https://api.openai.com/v1/embeddings
        method: POST
      response:
        body: '{"object":"list","data":[{"object":"embedding","index":0,"embedding":[0.1,0.2]}],"model":"text-embedding-3-small"}'
        headers:
            Content-Type:
                - application/json
        status: 200 OK
        code: 200
        duration: 1203425000
"#;

/// Azure chat recorded against a scrubbed deployment URL
pub const AZURE_CHAT: &str = r#"---
version: 2
interactions:
    - id: 0
      request:
        body: '{"model":"gpt-4o","messages":[{"role":"user","content":"Hello from Azure"}]}'
        headers:
            Accept:
                - '*/*'
            Content-Type:
                - application/json
        url: https://resource-name.cognitiveservices.azure.com/openai/deployments/gpt-4o/chat/completions
        method: POST
      response:
        body: '{"id":"chatcmpl-azure","choices":[{"index":0,"message":{"role":"assistant","content":"Hello from the cloud"}}]}'
        headers:
            Content-Type:
                - application/json
        status: 200 OK
        code: 200
        duration: 1m2.3s
"#;

/// Every fixture, by cassette name
pub fn all() -> Vec<(&'static str, &'static str)> {
    vec![
        ("chat-basic", CHAT_BASIC),
        ("chat-streaming", CHAT_STREAMING),
        ("embeddings/basic", EMBEDDINGS),
        ("azure-chat", AZURE_CHAT),
    ]
}
