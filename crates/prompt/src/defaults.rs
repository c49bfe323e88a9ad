//! Built-in prompt templates.
//!
//! Variables are plain strings; callers pre-format lists and leave optional
//! sections empty, which `{{#if}}` treats as absent.

use crate::types::PromptId;

/// Variables: `query`, `history` (optional), `limit` (optional).
pub const SUBQUERY: &str = r#"Given a new user query{{#if history}} being a continuation of previous conversation history{{/if}}, output a list of {{#if limit}}no more than {{limit}} {{/if}}relevant sub-questions in a list separated by only newlines that when composed can help answer the full user question. If the user query does not require subqueries (e.g. it already contains sufficient keywords) then respond with "None"

Example 1:
Q: Compare and contrast the revenue growth and EBITDA of Uber and Lyft for year 2021?
Subqueries:
What is the revenue growth of Uber
What is the EBITDA of Uber
What is the revenue growth of Lyft
What is the EBITDA of Lyft

Example 2:
Q: customer support services
Subqueries:
None

Example 3:
{{#if history}}Conversation History:
{{history}}
{{/if}}Q: {{query}}
Subqueries:
"#;

/// Variables: `documents`, `query`.
pub const RERANK: &str = r#"A list of documents is shown below. Each document has a number next to it along with a summary of the document. A question is also provided.
Respond with the numbers of the documents (without any additional info) you should consult to answer the question, in order of relevance, as well as the relevance score. The relevance score is a number from 1-10 based on how relevant you think the document is to the question.
Respond only with a JSON array. Do not include any documents that are not relevant to the question.
Example format:
Document 1:
<summary of document 1>

Document 2:
<summary of document 2>

...

Document 10:
<summary of document 10>

Question: <question>
Answer:
[{"doc": 9, "relevance": 7},{"doc": 3, "relevance": 4},{"doc": 7, "relevance": 3}]

Let's try this now:

{{documents}}
Question: {{query}}
Answer:
"#;

/// Variables: `sources`, `history` (optional), `query`.
pub const ANSWER: &str = r#"Context information is below.
----------------------------------
{{sources}}
{{#if history}}Message History:
{{history}}
----------------------------------
{{/if}}Given the context information and message history, and not prior knowledge, answer the query. Be specific and format the response with markdown syntax. Use lists if necessary.
Query: {{query}}
Answer:
"#;

/// Variables: `pairs`, `history` (optional), `query`.
pub const MERGE: &str = r#"Given the following pairs of subqueries and responses, merge the responses into a single response that answers the original query. Use markdown syntax to format the response. Use lists if necessary.

{{pairs}}
{{#if history}}------------------
Message History:
{{history}}
------------------
{{/if}}Query: {{query}}
Answer:
"#;

/// Variables: `new_query`, `previous_queries`, `sources`.
pub const CONTEXT_REQUEST: &str = r#"You are an agent designed to answer questions given chunks of texts from documents. We are to determine the next steps given a new query.

New Query: {{new_query}}

Previous queries:

{{previous_queries}}

Sources cited
{{sources}}

Choose one of the following actions, and follow the EXACT instructions in each choice in brackets

A: The sources that answered the previous queries probably don't answer all the info necessary to answer the new query (we should look for completely different/new sources) [reply with "Start new query"]

B: The documents that answered the previous queries probably could answer all the info, not necessarily these exact chunks (we should look ONLY within these same documents but query for potentially new relevant chunks) [reply with "Search documents"]

C: The provided sources is already sufficient to answer the query. [reply with "Use same sources"]

Reply with the bracketed text only.
"#;

/// Built-in template for a prompt id.
pub fn template(id: PromptId) -> &'static str {
    match id {
        PromptId::Subquery => SUBQUERY,
        PromptId::Rerank => RERANK,
        PromptId::Answer => ANSWER,
        PromptId::Merge => MERGE,
        PromptId::ContextRequest => CONTEXT_REQUEST,
    }
}
