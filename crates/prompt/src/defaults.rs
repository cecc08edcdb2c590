//! Built-in prompt definitions for the judgment tasks.
//!
//! Verdict prompts ask for a JSON object with exactly one key. The router
//! answers under `datasource`, the graders under `score`.

use crate::types::{PromptDefinition, PromptFormat, PromptOutputSpec, PromptTask};

const API_VERSION: &str = "1.0";
const CREATED_BY: &str = "builtin";

const ROUTE_SYSTEM: &str = "You are an expert at routing a user question to a vectorstore or web search. \
Use the vectorstore for questions on LLM agents, prompt engineering, and adversarial attacks. \
You do not need to be stringent with the keywords in the question related to these topics. \
Otherwise, use web search. Give a binary choice 'websearch' or 'vectorstore' based on the question. \
Return a JSON object with a single key 'datasource' and no preamble or explanation.";

const ROUTE_TEMPLATE: &str = "Question to route: {{question}}";

const RELEVANCE_SYSTEM: &str = "You are a grader assessing relevance of a retrieved document to a user question. \
If the document contains keywords related to the user question, grade it as relevant. \
It does not need to be a stringent test. The goal is to filter out erroneous retrievals. \
Give a binary score 'yes' or 'no' to indicate whether the document is relevant to the question. \
Return a JSON object with a single key 'score' and no preamble or explanation.";

const RELEVANCE_TEMPLATE: &str = "Here is the retrieved document:\n\n{{document}}\n\nHere is the user question: {{question}}";

const GENERATE_SYSTEM: &str = "You are an assistant for question-answering tasks. \
Use the following pieces of retrieved context to answer the question. \
If you don't know the answer, just say that you don't know. \
Use three sentences maximum and keep the answer concise.";

const GENERATE_TEMPLATE: &str = "Question: {{question}}\n\nContext:\n{{context}}\n\nAnswer:";

const GROUNDEDNESS_SYSTEM: &str = "You are a grader assessing whether an answer is grounded in / supported by a set of facts. \
Give a binary score 'yes' or 'no' to indicate whether the answer is grounded in / supported by the facts. \
Return a JSON object with a single key 'score' and no preamble or explanation.";

const GROUNDEDNESS_TEMPLATE: &str = "Here are the facts:\n-------\n{{documents}}\n-------\nHere is the answer: {{generation}}";

const USEFULNESS_SYSTEM: &str = "You are a grader assessing whether an answer is useful to resolve a question. \
Give a binary score 'yes' or 'no' to indicate whether the answer is useful to resolve the question. \
Return a JSON object with a single key 'score' and no preamble or explanation.";

const USEFULNESS_TEMPLATE: &str = "Here is the answer:\n-------\n{{generation}}\n-------\nHere is the question: {{question}}";

/// The built-in definition for `task`.
pub fn definition(task: PromptTask) -> PromptDefinition {
    let (title, system, template, format) = match task {
        PromptTask::Route => ("Question router", ROUTE_SYSTEM, ROUTE_TEMPLATE, PromptFormat::Json),
        PromptTask::Relevance => (
            "Retrieval relevance grader",
            RELEVANCE_SYSTEM,
            RELEVANCE_TEMPLATE,
            PromptFormat::Json,
        ),
        PromptTask::Generate => (
            "Grounded answer generator",
            GENERATE_SYSTEM,
            GENERATE_TEMPLATE,
            PromptFormat::Text,
        ),
        PromptTask::Groundedness => (
            "Groundedness grader",
            GROUNDEDNESS_SYSTEM,
            GROUNDEDNESS_TEMPLATE,
            PromptFormat::Json,
        ),
        PromptTask::Usefulness => (
            "Answer usefulness grader",
            USEFULNESS_SYSTEM,
            USEFULNESS_TEMPLATE,
            PromptFormat::Json,
        ),
    };

    PromptDefinition {
        id: task.id().to_string(),
        title: title.to_string(),
        api_version: API_VERSION.to_string(),
        created_by: CREATED_BY.to_string(),
        system: Some(system.to_string()),
        template: template.to_string(),
        output: PromptOutputSpec { format },
    }
}
