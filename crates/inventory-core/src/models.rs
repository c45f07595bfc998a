use serde::{Deserialize, Serialize};

/// A stored inventory item
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Item {
    pub id: i64,
    pub name: String,
    pub price: f64,
    pub quantity: i64,
    pub supplier_name: String,
    pub supplier_email: String,
    pub supplier_phone: String,
}

/// Item fields supplied on insert; the id is assigned by the database
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewItem {
    pub name: String,
    pub price: f64,
    pub quantity: i64,
    #[serde(default)]
    pub supplier_name: String,
    #[serde(default)]
    pub supplier_email: String,
    #[serde(default)]
    pub supplier_phone: String,
}

impl NewItem {
    pub fn new(name: impl Into<String>, price: f64, quantity: i64) -> Self {
        Self {
            name: name.into(),
            price,
            quantity,
            supplier_name: String::new(),
            supplier_email: String::new(),
            supplier_phone: String::new(),
        }
    }

    pub fn with_supplier(
        mut self,
        name: impl Into<String>,
        email: impl Into<String>,
        phone: impl Into<String>,
    ) -> Self {
        self.supplier_name = name.into();
        self.supplier_email = email.into();
        self.supplier_phone = phone.into();
        self
    }
}
