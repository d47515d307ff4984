//! Prompt construction for extraction and verification

use needle_domain::{ChatMessage, Record, RecordSchema};

/// Renders the system and user messages for one schema
///
/// Built once per run and shared by every chunk task.
#[derive(Debug, Clone)]
pub struct PromptBuilder {
    schema_name: String,
    fields: String,
    examples: Vec<String>,
}

impl PromptBuilder {
    /// Create a builder for `schema`, optionally seeded with example needles
    pub fn new(schema: &RecordSchema, examples: &[String]) -> Self {
        let fields = schema
            .describe_fields()
            .into_iter()
            .map(|(name, description)| format!("{} {}", name, description))
            .collect::<Vec<_>>()
            .join("\n");

        Self {
            schema_name: schema.name().to_string(),
            fields,
            examples: examples
                .iter()
                .map(|e| e.trim())
                .filter(|e| !e.is_empty())
                .map(str::to_string)
                .collect(),
        }
    }

    /// Schema name used in the prompts
    pub fn schema_name(&self) -> &str {
        &self.schema_name
    }

    /// The extraction system prompt
    pub fn extraction_system_prompt(&self) -> String {
        let mut prompt = String::new();
        prompt.push_str(&format!(
            "You are an expert at carefully parsing text and extracting hidden information. \
             Your task is to extract information based on the {} Model, given below. \
             Note, the information may or may not be present in the text. \
             The information you need to extract will follow:\n\n",
            self.schema_name
        ));
        prompt.push_str(&format!("Model: {}\nFields:\n{}\n\n", self.schema_name, self.fields));

        if !self.examples.is_empty() {
            prompt.push_str("## Example(s) of hidden information:\n");
            prompt.push_str(&self.examples.join("\n"));
            prompt.push_str("\n\n");
        }

        prompt.push_str("## IMPORTANT:\n");
        prompt.push_str(
            "**- The hidden information will be out of place within the text, you should not \
             extract any other information or any information that is within the context of \
             the text.**\n",
        );
        prompt.push_str(
            "**- Make NO assumptions about the information, only extract what is explicitly \
             stated.**\n",
        );
        prompt.push_str(
            "**- If a particular piece of information is not present, you should output `null`.**\n",
        );
        prompt.push_str(&format!(
            "**- If there are no hidden {} records in the text, you should output an empty list ([])**",
            self.schema_name
        ));
        prompt
    }

    /// Messages for one extraction call
    pub fn extraction_messages(&self, chunk: &str) -> Vec<ChatMessage> {
        vec![
            ChatMessage::system(self.extraction_system_prompt()),
            ChatMessage::user(format!(
                "Extract the information from the following:\n\n{}",
                chunk
            )),
        ]
    }

    /// The verification system prompt
    pub fn verification_system_prompt(&self) -> String {
        format!(
            "You are verifying information extracted from a text based on the {name} Model.\n\n\
             Model: {name}\nFields:\n{fields}\n\n\
             Given the text and the extracted information, decide whether the extracted \
             information is hidden information that is explicitly stated in the text and \
             matches the field definitions.\n\n\
             Answer with a single word: true or false. If you are uncertain, answer true.",
            name = self.schema_name,
            fields = self.fields
        )
    }

    /// Messages for one verification call
    pub fn verification_messages(&self, relevant_text: &str, record: &Record) -> Vec<ChatMessage> {
        let extracted = serde_json::to_string_pretty(record).unwrap_or_else(|_| record.to_string());
        vec![
            ChatMessage::system(self.verification_system_prompt()),
            ChatMessage::user(format!(
                "Text:\n{}\n\nExtracted Information:\n{}",
                relevant_text, extracted
            )),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use needle_domain::{FieldKind, FieldSpec, Role, SchemaRegistry};
    use serde_json::json;

    fn tech_company() -> RecordSchema {
        SchemaRegistry::with_builtins()
            .get("TechCompany")
            .unwrap()
            .clone()
    }

    #[test]
    fn test_extraction_prompt_lists_fields() {
        let builder = PromptBuilder::new(&tech_company(), &[]);
        let prompt = builder.extraction_system_prompt();

        assert!(prompt.contains("Model: TechCompany"));
        assert!(prompt.contains("name (str):"));
        assert!(prompt.contains("employee_count (int):"));
        assert!(prompt.contains("no hidden TechCompany records"));
        assert!(!prompt.contains("Example(s)"));
    }

    #[test]
    fn test_extraction_prompt_with_examples() {
        let examples = vec![
            "Acme Corp is a tech company in Springfield.".to_string(),
            "   ".to_string(),
        ];
        let builder = PromptBuilder::new(&tech_company(), &examples);
        let prompt = builder.extraction_system_prompt();

        assert!(prompt.contains("## Example(s) of hidden information:\nAcme Corp is a tech company in Springfield.\n\n"));
    }

    #[test]
    fn test_undescribed_field() {
        let schema =
            RecordSchema::new("Pet", vec![FieldSpec::bare("name", FieldKind::String)]).unwrap();
        let prompt = PromptBuilder::new(&schema, &[]).extraction_system_prompt();
        assert!(prompt.contains("name (str): No description provided"));
    }

    #[test]
    fn test_extraction_messages() {
        let builder = PromptBuilder::new(&tech_company(), &[]);
        let messages = builder.extraction_messages("Some chunk.\n\n");

        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].role, Role::System);
        assert_eq!(messages[1].role, Role::User);
        assert_eq!(
            messages[1].content,
            "Extract the information from the following:\n\nSome chunk.\n\n"
        );
    }

    #[test]
    fn test_verification_messages() {
        let schema = tech_company();
        let builder = PromptBuilder::new(&schema, &[]);
        let record = Record::from_json(&schema, &json!({"name": "Acme Corp"})).unwrap();
        let messages = builder.verification_messages("Acme Corp is here.", &record);

        assert!(messages[0].content.contains("true or false"));
        assert!(messages[1].content.starts_with("Text:\nAcme Corp is here.\n\nExtracted Information:\n{"));
        assert!(messages[1].content.contains("\"name\": \"Acme Corp\""));
        assert!(messages[1].content.contains("\"location\": null"));
    }
}
