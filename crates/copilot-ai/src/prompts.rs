//! Prompt templates

use copilot_core::{Category, ClassificationInput, ReplyRequest};

pub const CLASSIFIER_SYSTEM_PROMPT: &str = "You are an expert customer support ticket classifier. \
Analyze tickets and return structured JSON with category, priority, sentiment, urgency keywords, \
extracted details and a confidence score. Respond with JSON only.";

pub const REPLY_SYSTEM_PROMPT: &str = "You are a helpful customer support agent. Write professional, \
empathetic and concise responses to customer tickets. Stay polite whatever the customer's tone.";

/// Characters of each article body included in the reply prompt
pub const ARTICLE_EXCERPT_CHARS: usize = 500;

pub fn classification_prompt(input: &ClassificationInput) -> String {
    let categories: Vec<&str> = Category::ALL.iter().map(Category::as_str).collect();
    let mut context = String::new();
    if let Some(order_id) = input.order_id.as_deref() {
        context.push_str(&format!("\nOrder ID: {order_id}"));
    }
    if let Some(name) = input.customer_name.as_deref() {
        context.push_str(&format!("\nCustomer: {name}"));
    }

    format!(
        r#"Analyze this customer support ticket and classify it.

Subject: {subject}
Description: {description}{context}

Respond with a JSON object of this shape:
{{
  "category": "<one of: {categories}>",
  "priority": "<one of: low, medium, high, critical>",
  "sentiment": "<one of: positive, neutral, negative>",
  "urgency_keywords": ["<phrases signalling urgency, e.g. 'asap', 'immediately'>"],
  "extracted_info": {{
    "order_id": "<order number if mentioned>",
    "amount": "<money amount if mentioned>",
    "date_mentioned": "<dates or deadlines mentioned>",
    "product_name": "<product if mentioned>"
  }},
  "confidence": <number between 0 and 1>,
  "reasoning": "<one sentence explaining the classification>"
}}

Priority guidelines:
- critical: outage, security problem, failed payment, very angry customer
- high: order problems, refund requests, locked out of account
- medium: general questions, minor issues, feature requests
- low: feedback, compliments, casual enquiries

Sentiment guidelines:
- negative: frustrated, angry or disappointed language
- neutral: matter-of-fact or informational
- positive: happy, satisfied, complimentary"#,
        subject = input.subject,
        description = input.description,
        categories = categories.join(", "),
    )
}

fn excerpt(text: &str) -> String {
    match text.char_indices().nth(ARTICLE_EXCERPT_CHARS) {
        Some((idx, _)) => format!("{}...", &text[..idx]),
        None => text.to_string(),
    }
}

pub fn reply_prompt(request: &ReplyRequest) -> String {
    let knowledge = if request.articles.is_empty() {
        String::new()
    } else {
        let articles: Vec<String> = request
            .articles
            .iter()
            .map(|a| format!("KB Article: {}\n{}", a.title, excerpt(&a.content)))
            .collect();
        format!("\n\nRelevant knowledge base articles:\n{}", articles.join("\n\n"))
    };

    format!(
        r#"Write a response to this customer support ticket.

Subject: {subject}
Description: {description}
Category: {category}
Priority: {priority}
Customer sentiment: {sentiment}{knowledge}

The response should:
1. Acknowledge the customer's issue
2. Offer a solution or a concrete next step
3. Stay professional and friendly
4. Be 2-3 short paragraphs at most

Do not include a greeting or a signature."#,
        subject = request.subject,
        description = request.description,
        category = request.category,
        priority = request.priority,
        sentiment = request.sentiment,
    )
}
