use intake_core::config::BusinessConfig;
use intake_core::money::format_price;
use intake_core::Property;

pub fn inquiry_available(property: &Property, business: &BusinessConfig) -> String {
    format!(
        "Thank you for your interest in {}! This property is available for viewing. \
         Please call our agent at {} to schedule an inspection.",
        property.name, business.agent_phone_number
    )
}

pub fn inquiry_unavailable(property: &Property) -> String {
    format!(
        "Thank you for your interest in {}! Unfortunately, this property is currently not \
         available. May I know your budget so I can recommend similar properties?",
        property.name
    )
}

pub const INQUIRY_WITHOUT_PROPERTY: &str = "Thank you for your interest in our properties. \
    To help you better, could you please share your budget and preferred location? \
    This will help us recommend suitable properties for you.";

pub const BUDGET_MISSING: &str = "Thank you for your message. To help you find suitable \
    properties, could you please share your budget in numerical format?";

pub const BUDGET_UNREADABLE: &str = "I couldn't recognize the budget amount. Please send your \
    budget in numerical format, for example: 200000";

pub fn budget_recommendations(properties: &[Property], business: &BusinessConfig) -> String {
    let mut reply =
        String::from("Based on your budget, here are some properties you might be interested in:\n\n");
    for property in properties {
        reply.push_str(&format!(
            "- {}: {} bedroom(s) in {} for ${}\n",
            property.name,
            property.bedrooms,
            property.location,
            format_price(&property.price)
        ));
    }
    reply.push_str(&format!(
        "\nFor more details, please follow our WhatsApp channel: {}\n\
         You can also check our Instagram: {}",
        business.whatsapp_channel_link, business.instagram_link
    ));
    reply
}

pub fn budget_without_matches(business: &BusinessConfig) -> String {
    format!(
        "Thank you for sharing your budget. We don't have properties in that range at the \
         moment. Please join our WhatsApp channel for updates on new properties: {}",
        business.whatsapp_channel_link
    )
}

pub const FEEDBACK_POSITIVE: &str = "Great to hear you liked the property! Would you like to \
    proceed with the application? Please let us know your preferred payment method and schedule.";

pub const FEEDBACK_NEGATIVE: &str = "I'm sorry to hear the property didn't meet your \
    expectations. Could you share what specific features you're looking for? This will help \
    us find a better match for your needs.";

pub const PAYMENT_ACKNOWLEDGED: &str = "Thank you for sharing your payment information. Our \
    agent will contact you shortly to guide you through the next steps in the application \
    process. If you have any questions in the meantime, please don't hesitate to ask.";

pub fn general(business: &BusinessConfig) -> String {
    format!(
        "Thank you for your message. If you're looking for properties, please share your budget \
         and preferences so we can help you find suitable options. You can also check our \
         available listings on our WhatsApp channel: {} or Instagram: {}",
        business.whatsapp_channel_link, business.instagram_link
    )
}

pub fn feedback_notes(message: &str, sentiment: &str) -> String {
    format!("Feedback: {message} (Sentiment: {sentiment})")
}

pub fn payment_notes(message: &str) -> String {
    format!("Payment info: {message}")
}
