//! The transaction event: the flattened snapshot broadcast on payment
//! outcome.
//!
//! Field names are the bus wire contract; consumers parse these exact
//! keys and perform no further enrichment. Deserialization defaults
//! every field so consumers can parse a partial message and reject it
//! through [`TransactionEvent::missing_required_fields`] instead of a
//! parse error.

use directory::{Product, UserDetails};
use ledger::OrderRecord;
use serde::{Deserialize, Serialize};

/// The enriched message published to the topic exchange.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TransactionEvent {
    #[serde(rename = "orderID")]
    pub order_id: String,
    #[serde(rename = "userID")]
    pub user_id: i64,
    #[serde(rename = "productID")]
    pub product_id: i64,
    pub status: String,
    #[serde(rename = "paymentAmount")]
    pub payment_amount: f64,
    #[serde(rename = "stripeCusID")]
    pub stripe_cus_id: String,
    /// Empty on the unsuccessful path.
    #[serde(rename = "transactionID")]
    pub transaction_id: String,
    /// Empty on the successful path.
    pub error: String,

    #[serde(rename = "productName")]
    pub product_name: String,
    #[serde(rename = "productDesc")]
    pub product_desc: String,
    #[serde(rename = "originalImage")]
    pub image_url: String,
    pub price: f64,

    pub length: f64,
    pub width: f64,
    pub height: f64,
    pub weight: f64,
    #[serde(rename = "distanceUnit")]
    pub distance_unit: String,
    #[serde(rename = "massUnit")]
    pub mass_unit: String,

    #[serde(rename = "userEmail")]
    pub user_email: String,
    #[serde(rename = "recipientName")]
    pub recipient_name: String,
    #[serde(rename = "recipientStreet")]
    pub recipient_street: String,
    #[serde(rename = "recipientCity")]
    pub recipient_city: String,
    #[serde(rename = "recipientState")]
    pub recipient_state: String,
    #[serde(rename = "recipientZip")]
    pub recipient_zip: String,
    #[serde(rename = "recipientCountry")]
    pub recipient_country: String,
    #[serde(rename = "recipientPhone")]
    pub recipient_phone: String,

    #[serde(rename = "renterID")]
    pub renter_id: i64,
    #[serde(rename = "senderName")]
    pub sender_name: String,
    #[serde(rename = "senderStreet")]
    pub sender_street: String,
    #[serde(rename = "senderCity")]
    pub sender_city: String,
    #[serde(rename = "senderState")]
    pub sender_state: String,
    #[serde(rename = "senderZip")]
    pub sender_zip: String,
    #[serde(rename = "senderCountry")]
    pub sender_country: String,
    #[serde(rename = "senderPhone")]
    pub sender_phone: String,
    #[serde(rename = "senderEmail")]
    pub sender_email: String,
}

impl TransactionEvent {
    /// Assembles a complete event from the order, the payment outcome,
    /// and the three enrichment lookups. The sender is the product
    /// owner (the renter); the recipient is the paying user.
    pub fn assemble(
        order: &OrderRecord,
        status: &str,
        stripe_cus_id: &str,
        transaction_id: &str,
        error: &str,
        product: &Product,
        renter: &UserDetails,
        user: &UserDetails,
    ) -> Self {
        Self {
            order_id: order.order_id.to_string(),
            user_id: order.user_id.value(),
            product_id: order.product_id.value(),
            status: status.to_string(),
            payment_amount: order.payment_amount.as_major_f64(),
            stripe_cus_id: stripe_cus_id.to_string(),
            transaction_id: transaction_id.to_string(),
            error: error.to_string(),

            product_name: product.name.clone(),
            product_desc: product.description.clone(),
            image_url: product.image_url.clone(),
            price: product.price.as_major_f64(),

            length: product.dimensions.length,
            width: product.dimensions.width,
            height: product.dimensions.height,
            weight: product.dimensions.weight,
            distance_unit: product.dimensions.distance_unit.clone(),
            mass_unit: product.dimensions.mass_unit.clone(),

            user_email: user.email.clone(),
            recipient_name: user.name.clone(),
            recipient_street: user.street1.clone(),
            recipient_city: user.city.clone(),
            recipient_state: user.state.clone(),
            recipient_zip: user.zip.clone(),
            recipient_country: user.country.clone(),
            recipient_phone: user.phone.clone(),

            renter_id: product.owner_id.value(),
            sender_name: renter.name.clone(),
            sender_street: renter.street1.clone(),
            sender_city: renter.city.clone(),
            sender_state: renter.state.clone(),
            sender_zip: renter.zip.clone(),
            sender_country: renter.country.clone(),
            sender_phone: renter.phone.clone(),
            sender_email: renter.email.clone(),
        }
    }

    /// Returns the required fields that are absent or empty.
    ///
    /// Downstream consumers assume completeness, so a non-empty result
    /// must block the publish. Phone numbers and the recipient name are
    /// not required: the shipping consumer substitutes fallbacks.
    pub fn missing_required_fields(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        let required_strings: [(&'static str, &str); 17] = [
            ("orderID", &self.order_id),
            ("productName", &self.product_name),
            ("productDesc", &self.product_desc),
            ("distanceUnit", &self.distance_unit),
            ("massUnit", &self.mass_unit),
            ("userEmail", &self.user_email),
            ("recipientStreet", &self.recipient_street),
            ("recipientCity", &self.recipient_city),
            ("recipientState", &self.recipient_state),
            ("recipientZip", &self.recipient_zip),
            ("recipientCountry", &self.recipient_country),
            ("senderName", &self.sender_name),
            ("senderStreet", &self.sender_street),
            ("senderCity", &self.sender_city),
            ("senderState", &self.sender_state),
            ("senderZip", &self.sender_zip),
            ("senderCountry", &self.sender_country),
        ];
        for (name, value) in required_strings {
            if value.is_empty() {
                missing.push(name);
            }
        }
        if self.sender_email.is_empty() {
            missing.push("senderEmail");
        }
        if self.user_id <= 0 {
            missing.push("userID");
        }
        if self.product_id <= 0 {
            missing.push("productID");
        }
        if self.length <= 0.0 || self.width <= 0.0 || self.height <= 0.0 || self.weight <= 0.0 {
            missing.push("dimensions");
        }
        missing
    }
}
