/// Review instruction template sent to every provider. The response contract
/// (JSON array, five fields, new-file line numbers) is what the response
/// validator expects.
pub fn render_review_prompt(diff: &str) -> String {
    format!(
        "You are an expert code reviewer. Analyze the following git diff and return \n\
         ONLY a valid JSON array of issues. No explanation, no markdown, no text outside the JSON.\n\n\
         Each issue must follow this exact schema:\n\
         {{\n\
         \x20 \"file\": \"path/to/file.py\",\n\
         \x20 \"line\": 42,\n\
         \x20 \"severity\": \"high|medium|low\",\n\
         \x20 \"category\": \"bug|security|performance|style|maintainability\",\n\
         \x20 \"message\": \"Clear, actionable description of the issue\"\n\
         }}\n\n\
         Rules:\n\
         - Only flag real, meaningful issues\n\
         - Ignore minor style nitpicks\n\
         - If no issues found, return an empty array []\n\
         - Line number must refer to the new file's line number in the diff\n\n\
         Diff to review:\n\
         {diff}\n"
    )
}
