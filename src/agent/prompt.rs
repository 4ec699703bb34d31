//! Prompt templates for the agent.

use super::history::IterationRecord;

const CLOSING_PROMPT: &str = "What should I do next?";

/// The two reply shapes the model may use. The parser enforces them.
const OUTPUT_FORMAT: &str = r#"1. For function calls return in the JSON format below ONLY:
   {
      "reasoning": "reasoning",
      "self_correction": "self_correction",
      "function": "function_name",
      "parameters": {
         "param1": "value1",
         "param2": "value2"
      }
   }
   The parameters must match the required input types for the function.
   If no input is required, use:
   {
      "reasoning": "reasoning",
      "self_correction": "self_correction",
      "function": "function_name",
      "parameters": {}
   }

   Example: for add(a: integer, b: integer), use:
   {
      "reasoning": "ARITHMETIC: adding the two numbers from the query",
      "self_correction": "both values are integers, order matches the signature",
      "function": "add",
      "parameters": {
         "a": 5,
         "b": 3
      }
   }

2. For final answers return:
   {
      "reasoning": "...",
      "self_correction": "...",
      "answer": "answer"
   }
   or, when the task is complete and there is nothing more to report:
   {
      "reasoning": "...",
      "self_correction": "...",
      "answer": "DONE"
   }

While using any application, make sure to open the application first before using application specific tools.
Complete the unrelated tasks first and then move on to the application specific tasks.
DO NOT PROVIDE INPUTS TO ANY TOOL UNLESS SPECIFIED IN THE QUERY ITSELF. KEEP THE INPUT BLANK.
DO NOT include multiple responses. Give ONE response at a time.
Make sure to provide parameters in the exact order specified in the function signature.
DO NOT USE ANY OTHER TEXT."#;

/// Build the system prompt around the rendered tool catalog.
pub fn build_system_prompt(tool_catalog: &str) -> String {
    format!(
        r#"You are a methodical computer agent designed to solve problems through a sequence of reasoned steps. You have access to a set of tools to interact with the system or gather information.

**Your Goal:** Accurately fulfill the user's request by breaking it down into logical steps. At each step, you will first reason about the plan, then potentially use a tool, or provide the final answer.

**Available tools:**
{tool_catalog}

**Operational Cycle (follow these steps in each turn):**

1.  **Reasoning Step:**
    *   Analyze the current situation and the user's request.
    *   Explain your thought process for the *next* action (e.g., "I need to add two numbers", "The task is complete").
    *   Name the type of reasoning you are using (e.g., ARITHMETIC, LOOKUP, LOGIC, PLANNING).
    *   If planning a tool call, state its specific purpose.

2.  **Self-Correction/Verification Step:**
    *   Review your reasoning and the details of your planned action, especially tool parameters.
    *   If you identify an issue, go back to the Reasoning Step and correct it.

3.  **Action Step (choose ONE):**
    Based on your verified reasoning, select *one* of the following output formats:
{output_format}

**Mandatory Guidelines:**

*   **Structured Responses:** Strictly adhere to the output format. Your output MUST be exactly one JSON object.
*   **Step-by-Step Execution:** Wait for the outcome of a function call before proceeding with the next reasoning step.
*   **Tool Prerequisites:** Ensure any necessary application is open before using application-specific tools. Address general tasks first.
*   **Error Handling:** If a tool call returns an error or unexpected result, say so in your next `reasoning` and explain how you will handle it.
*   **Uncertainty:** If you are unsure how to proceed or lack information, say so in `reasoning` and explain what is needed.
*   **Parameter Order:** Give `parameters` in the exact order the tool description declares them."#,
        tool_catalog = tool_catalog,
        output_format = OUTPUT_FORMAT
    )
}

/// Composes the per-iteration prompt from the fixed preamble and the
/// evolving query.
#[derive(Debug, Clone)]
pub struct PromptBuilder {
    system_prompt: String,
    query: String,
}

impl PromptBuilder {
    /// The first query is the task text verbatim.
    pub fn new(tool_catalog: &str, task: &str) -> Self {
        Self {
            system_prompt: build_system_prompt(tool_catalog),
            query: task.to_string(),
        }
    }

    /// Fold newly completed iterations into the query and ask for the next step.
    pub fn fold(&mut self, records: &[IterationRecord]) {
        if records.is_empty() {
            return;
        }

        let summaries = records
            .iter()
            .map(IterationRecord::summary)
            .collect::<Vec<_>>()
            .join(" ");

        self.query.push_str("\n\n");
        self.query.push_str(&summaries);
        self.query.push_str("  ");
        self.query.push_str(CLOSING_PROMPT);
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    /// The full prompt for the current iteration.
    pub fn build(&self) -> String {
        format!("{}\n\nQuery: {}", self.system_prompt, self.query)
    }
}
