//! Shop reference data and the system instruction handed to the model.
//!
//! Everything here is static or a pure function of its arguments. The model
//! does all of the price and scheduling reasoning; this module only tells it
//! what the shop charges and how to behave.

use chrono::{Local, NaiveDate};

pub const SHOP_NAME: &str = "StitchPerfect Boutique";
pub const SHOP_TAGLINE: &str = "Bespoke Tailoring & Design";
pub const ASSISTANT_NAME: &str = "Anka";

/// Replaces a reply that failed mid-stream.
pub const STREAM_FAILURE_TEXT: &str =
    "I apologize, I'm having trouble retrieving that information right now. Please try again.";

/// Seeded instead of the greeting when no chat session could be created.
pub const SESSION_INIT_FAILURE_TEXT: &str =
    "I'm having trouble connecting to the boutique server. Please check your API key configuration.";

pub const DISCLAIMER_TEXT: &str =
    "StitchPerfect AI can make mistakes. Please verify final quotes in-store.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PricingItem {
    pub item: &'static str,
    pub price_range: &'static str,
    pub time_estimate: &'static str,
}

pub const PRICING_GUIDE: &[PricingItem] = &[
    PricingItem {
        item: "Basic Blouse",
        price_range: "₹250 - ₹350",
        time_estimate: "3-4 Days",
    },
    PricingItem {
        item: "Princess Cut / Padded Blouse",
        price_range: "₹300 - ₹450",
        time_estimate: "5-6 Days",
    },
    PricingItem {
        item: "Designer / Bridal Blouse",
        price_range: "₹1000 - ₹10000+",
        time_estimate: "10-15 Days",
    },
    PricingItem {
        item: "Simple Kurti",
        price_range: "₹350 - ₹400",
        time_estimate: "4-5 Days",
    },
    PricingItem {
        item: "Anarkali / Gown",
        price_range: "₹500 - ₹600",
        time_estimate: "7-10 Days",
    },
    PricingItem {
        item: "Salwar Kameez Set",
        price_range: "₹400 - ₹500",
        time_estimate: "1 Week",
    },
    PricingItem {
        item: "Hemming / Alterations",
        price_range: "₹25 - ₹35",
        time_estimate: "24-48 Hours",
    },
];

impl PricingItem {
    pub fn bullet(&self) -> String {
        format!(
            "- {}: {} (Approx. {})",
            self.item, self.price_range, self.time_estimate
        )
    }
}

/// One bullet line per item, newline separated, no trailing newline.
pub fn format_pricing_guide() -> String {
    PRICING_GUIDE
        .iter()
        .map(PricingItem::bullet)
        .collect::<Vec<_>>()
        .join("\n")
}

/// Build the system instruction for a conversation with `customer_name`.
///
/// The name is interpolated verbatim, so empty or odd names still produce a
/// usable instruction. `today` is rendered as `M/D/YYYY`.
pub fn system_instruction(customer_name: &str, today: NaiveDate) -> String {
    format!(
        r#"
You are {assistant}, the expert fashion consultant and virtual assistant for "{shop}".
You are speaking with a customer named "{customer_name}".

Your goal is to assist customers with:
1. Stitching price estimates (Use the guide below, but emphasize that final price depends on fabric and design complexity).
2. Estimated delivery times.
3. Guidance on how to take measurements (Suggest visiting the shop for accurate fitting, or offer general tips).
4. Scheduling appointments.

**Pricing & Time Guide:**
{guide}

**Rules:**
- Tone: Warm, professional, stylish, and helpful.
- Always address the customer by name at least once in the conversation.
- If a customer asks for a specific design price, ask for details (e.g., "Is it for a wedding?", "Do you need embroidery?") to give a better estimate.
- If asked about measurements, say: "For the perfect fit, we recommend visiting our store so our master tailor can measure you. However, I can guide you on basic self-measurement if you prefer."
- Do not confirm orders effectively; say "I've noted your interest. Please visit us or call [Phone Number] to finalize the order."
- Keep responses concise and easy to read on mobile.
- If the user asks something unrelated to tailoring/fashion, politely steer them back to our services.

Current Date: {date}
"#,
        assistant = ASSISTANT_NAME,
        shop = SHOP_NAME,
        guide = format_pricing_guide(),
        date = today.format("%-m/%-d/%Y"),
    )
}

pub fn today_system_instruction(customer_name: &str) -> String {
    system_instruction(customer_name, Local::now().date_naive())
}

pub fn greeting(customer_name: &str) -> String {
    format!(
        "Hello {customer_name}! Lovely to meet you. I'm {ASSISTANT_NAME} from {SHOP_NAME}. \n\n\
How can I help you today? I can assist with pricing for blouses, kurtis, suits, or give you an estimate on delivery times."
    )
}
