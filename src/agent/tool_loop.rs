//! 工具调用循环 - 有界的显式多轮对话
//!
//! 每一轮：调用模型 -> 若无工具调用请求则结束并返回叙述文本；
//! 否则按请求顺序派发工具、把结果逐条追加进消息线程，进入下一轮。
//! 循环持有自己的消息线程累加器，模型层只负责单轮补全。

use anyhow::Result;
use std::collections::HashMap;
use std::sync::Arc;

use crate::agent::adapters::BoundToolAdapter;
use crate::agent::context::ModelGateway;
use crate::llm::client::types::{ChatMessage, ToolSchema};

/// 工具调用循环的产出
#[derive(Debug, Clone)]
pub struct ToolLoopOutcome {
    /// 模型的最终叙述文本
    pub narrative: String,
    /// 实际消耗的模型轮次
    pub turns_used: usize,
    /// 循环中派发的工具调用总数
    pub tool_calls: usize,
}

/// 运行一个有界的工具调用循环
///
/// 预算约束的是模型轮次而非工具调用次数，一轮内的多个工具调用都会被执行。
/// 预算耗尽时以最后一段叙述文本收尾并附中断说明，不视为错误。
pub async fn run_tool_loop(
    model: Arc<dyn ModelGateway>,
    system_prompt: &str,
    opening_prompt: String,
    adapters: &HashMap<String, BoundToolAdapter>,
    step_budget: usize,
    verbose: bool,
) -> Result<ToolLoopOutcome> {
    let tools: Vec<ToolSchema> = {
        let mut schemas: Vec<ToolSchema> =
            adapters.values().map(|adapter| adapter.schema()).collect();
        schemas.sort_by(|a, b| a.name.cmp(&b.name));
        schemas
    };

    let mut thread: Vec<ChatMessage> = vec![ChatMessage::User(opening_prompt)];
    let mut last_narrative = String::new();
    let mut tool_calls_total = 0usize;

    for turn in 0..step_budget {
        if verbose {
            println!("   🔄 模型轮次 {}/{}", turn + 1, step_budget);
        }

        let model_turn = model.converse(system_prompt, &thread, &tools).await?;

        if !model_turn.text.trim().is_empty() {
            last_narrative = model_turn.text.clone();
        }

        // 没有工具调用请求即为该步骤的终止信号
        // 终止轮文本为空时回退到此前累积的叙述，模型在工具调用轮产出的发现不能丢
        if model_turn.tool_calls.is_empty() {
            let narrative = if model_turn.text.trim().is_empty() {
                last_narrative
            } else {
                model_turn.text
            };
            return Ok(ToolLoopOutcome {
                narrative,
                turns_used: turn + 1,
                tool_calls: tool_calls_total,
            });
        }

        thread.push(ChatMessage::Assistant {
            text: model_turn.text,
            tool_calls: model_turn.tool_calls.clone(),
        });

        // 严格按模型请求的顺序派发
        for request in &model_turn.tool_calls {
            tool_calls_total += 1;
            let content = match adapters.get(&request.tool_name) {
                Some(adapter) => adapter.invoke(&request.arguments).await.to_model_payload(),
                None => {
                    // 请求了未绑定的工具：以错误响应回传，循环继续
                    eprintln!("   ⚠️ 模型请求了未绑定的工具: {}", request.tool_name);
                    format!(
                        "{{\"error\": \"工具 {} 不在本步骤可用工具之列\"}}",
                        request.tool_name
                    )
                }
            };
            thread.push(ChatMessage::ToolResponse {
                call_id: request.call_id.clone(),
                tool_name: request.tool_name.clone(),
                content,
            });
        }
    }

    // 预算耗尽：软上限，带着已有发现收尾
    println!("   ⏹️ 步骤预算耗尽({}轮)，以当前发现收尾", step_budget);
    let narrative = if last_narrative.is_empty() {
        format!("[注意: 因达到最大迭代次数({})而被中断，未产出叙述文本]", step_budget)
    } else {
        format!(
            "{}\n\n[注意: 因达到最大迭代次数({})而被中断]",
            last_narrative, step_budget
        )
    };

    Ok(ToolLoopOutcome {
        narrative,
        turns_used: step_budget,
        tool_calls: tool_calls_total,
    })
}
