//! 对话线程的统一消息模型 - 工具调用循环的显式历史累加器

use rig::OneOrMany;
use rig::completion::{AssistantContent, Message, ToolDefinition};
use rig::message::{ToolResultContent, UserContent};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// 工具目录条目 - 喂给模型的工具名称、说明与参数schema
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolSchema {
    pub name: String,
    pub description: String,
    pub parameters: Value,
}

impl ToolSchema {
    /// 转换为rig的工具定义
    pub fn to_definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: self.name.clone(),
            description: self.description.clone(),
            parameters: self.parameters.clone(),
        }
    }
}

/// 模型发起的一次工具调用请求
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCallRequest {
    pub call_id: String,
    pub tool_name: String,
    pub arguments: Value,
}

/// 单轮模型响应 - 叙述文本与工具调用请求可以同时存在
#[derive(Debug, Clone, Default)]
pub struct ModelTurn {
    pub text: String,
    pub tool_calls: Vec<ToolCallRequest>,
}

impl ModelTurn {
    /// 从rig的响应内容中提取文本与工具调用
    pub fn from_choice(choice: &OneOrMany<AssistantContent>) -> Self {
        let mut texts = Vec::new();
        let mut tool_calls = Vec::new();

        for content in choice.iter() {
            match content {
                AssistantContent::Text(text) => texts.push(text.text.clone()),
                AssistantContent::ToolCall(tool_call) => tool_calls.push(ToolCallRequest {
                    call_id: tool_call.id.clone(),
                    tool_name: tool_call.function.name.clone(),
                    arguments: tool_call.function.arguments.clone(),
                }),
                _ => {}
            }
        }

        Self {
            text: texts.join("\n"),
            tool_calls,
        }
    }
}

/// 对话消息
#[derive(Debug, Clone)]
pub enum ChatMessage {
    /// 用户消息
    User(String),
    /// 助手消息，可能携带工具调用请求
    Assistant {
        text: String,
        tool_calls: Vec<ToolCallRequest>,
    },
    /// 工具调用结果，与发起请求的call_id一一对应
    ToolResponse {
        call_id: String,
        tool_name: String,
        content: String,
    },
}

impl ChatMessage {
    /// 转换为rig消息
    pub fn to_rig_message(&self) -> Message {
        match self {
            ChatMessage::User(text) => Message::user(text),
            ChatMessage::Assistant { text, tool_calls } => {
                let mut contents = Vec::new();
                if !text.is_empty() {
                    contents.push(AssistantContent::text(text));
                }
                for call in tool_calls {
                    contents.push(AssistantContent::tool_call(
                        &call.call_id,
                        &call.tool_name,
                        call.arguments.clone(),
                    ));
                }
                if contents.is_empty() {
                    contents.push(AssistantContent::text(""));
                }
                Message::Assistant {
                    id: None,
                    content: OneOrMany::many(contents)
                        .unwrap_or_else(|_| OneOrMany::one(AssistantContent::text(""))),
                }
            }
            ChatMessage::ToolResponse {
                call_id, content, ..
            } => Message::User {
                content: OneOrMany::one(UserContent::tool_result(
                    call_id,
                    OneOrMany::one(ToolResultContent::text(content)),
                )),
            },
        }
    }
}

/// 将对话线程拆分为（历史消息，最后一条消息）供completion调用使用
pub fn split_thread(thread: &[ChatMessage]) -> Option<(Vec<Message>, Message)> {
    let (last, history) = thread.split_last()?;
    let history = history.iter().map(|m| m.to_rig_message()).collect();
    Some((history, last.to_rig_message()))
}
