use crate::gateway::error::GatewayError;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::str::FromStr;

/// Payment channel families the gateway accepts
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum PaymentMethod {
    #[serde(rename = "E_WALLET")]
    EWallet,
    #[serde(rename = "BANK_TRANSFER")]
    BankTransfer,
}

impl PaymentMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::EWallet => "E_WALLET",
            PaymentMethod::BankTransfer => "BANK_TRANSFER",
        }
    }
}

impl std::fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for PaymentMethod {
    type Err = GatewayError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_uppercase().as_str() {
            "E_WALLET" => Ok(PaymentMethod::EWallet),
            "BANK_TRANSFER" => Ok(PaymentMethod::BankTransfer),
            _ => Err(GatewayError::Serialization {
                message: format!("unsupported payment method: {}", value),
            }),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CustomerDetails {
    pub first_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
}

/// Charge creation request for the Snap API
///
/// `gross_amount` is integral because the gateway rejects fractional
/// amounts on e-wallet and virtual account channels.
#[derive(Debug, Clone)]
pub struct ChargeRequest {
    pub order_id: String,
    pub gross_amount: i64,
    pub customer: CustomerDetails,
    pub payment_method: PaymentMethod,
    pub specific_method: Option<String>,
}

impl ChargeRequest {
    /// Channels enabled for this charge
    pub fn enabled_payments(&self) -> Vec<&'static str> {
        match self.payment_method {
            PaymentMethod::EWallet => match self.specific_method_lower().as_deref() {
                Some("qris") => vec!["qris"],
                Some("gopay") => vec!["gopay"],
                _ => vec!["gopay", "shopeepay", "qris"],
            },
            PaymentMethod::BankTransfer => {
                vec!["bca_va", "bni_va", "permata_va", "bri_va", "other_va"]
            }
        }
    }

    /// Bank for the `bank_transfer` directive, when one was requested
    pub fn bank_transfer_bank(&self) -> Option<String> {
        if self.payment_method != PaymentMethod::BankTransfer {
            return None;
        }
        match self.specific_method_lower().as_deref() {
            Some(bank @ ("bca" | "bni" | "bri" | "permata")) => Some(bank.to_string()),
            _ => None,
        }
    }

    /// Build the Snap transaction payload
    pub fn to_snap_payload(&self) -> JsonValue {
        let mut payload = serde_json::json!({
            "transaction_details": {
                "order_id": self.order_id,
                "gross_amount": self.gross_amount,
            },
            "customer_details": self.customer,
            "enabled_payments": self.enabled_payments(),
        });

        if let Some(bank) = self.bank_transfer_bank() {
            payload["bank_transfer"] = serde_json::json!({ "bank": bank });
        }

        payload
    }

    fn specific_method_lower(&self) -> Option<String> {
        self.specific_method
            .as_ref()
            .map(|m| m.trim().to_lowercase())
    }
}

/// Snap charge creation response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChargeResponse {
    pub token: String,
    pub redirect_url: String,
}

/// Webhook notification payload
///
/// `gross_amount` stays a string because the signature is computed over
/// the exact characters the gateway sent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayNotification {
    pub order_id: String,
    pub status_code: String,
    pub gross_amount: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub signature_key: Option<String>,
    pub transaction_status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fraud_status: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VaNumber {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bank: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub va_number: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayAction {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

/// Live transaction status as reported by the gateway
///
/// Every field is optional; the gateway omits fields that do not apply to
/// the payment channel in use.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GatewayStatus {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transaction_status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fraud_status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub currency: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gross_amount: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transaction_time: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transaction_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status_message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub merchant_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub va_numbers: Option<Vec<VaNumber>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub permata_va_number: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bill_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub biller_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub actions: Option<Vec<GatewayAction>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expiry_time: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn charge(method: PaymentMethod, specific: Option<&str>) -> ChargeRequest {
        ChargeRequest {
            order_id: "tx-1".to_string(),
            gross_amount: 50000,
            customer: CustomerDetails {
                first_name: "Budi".to_string(),
                email: Some("budi@example.com".to_string()),
                phone: None,
            },
            payment_method: method,
            specific_method: specific.map(|s| s.to_string()),
        }
    }

    #[test]
    fn ewallet_channel_selection() {
        assert_eq!(
            charge(PaymentMethod::EWallet, Some("qris")).enabled_payments(),
            vec!["qris"]
        );
        assert_eq!(
            charge(PaymentMethod::EWallet, Some("GoPay")).enabled_payments(),
            vec!["gopay"]
        );
        assert_eq!(
            charge(PaymentMethod::EWallet, None).enabled_payments(),
            vec!["gopay", "shopeepay", "qris"]
        );
    }

    #[test]
    fn bank_transfer_channel_selection() {
        let request = charge(PaymentMethod::BankTransfer, Some("bca"));
        assert_eq!(
            request.enabled_payments(),
            vec!["bca_va", "bni_va", "permata_va", "bri_va", "other_va"]
        );
        assert_eq!(request.bank_transfer_bank().as_deref(), Some("bca"));

        let no_bank = charge(PaymentMethod::BankTransfer, Some("mandiri"));
        assert_eq!(no_bank.bank_transfer_bank(), None);
    }

    #[test]
    fn ewallet_never_gets_bank_directive() {
        let request = charge(PaymentMethod::EWallet, Some("bca"));
        assert_eq!(request.bank_transfer_bank(), None);
    }

    #[test]
    fn snap_payload_shape() {
        let payload = charge(PaymentMethod::BankTransfer, Some("bni")).to_snap_payload();
        assert_eq!(payload["transaction_details"]["order_id"], "tx-1");
        assert_eq!(payload["transaction_details"]["gross_amount"], 50000);
        assert_eq!(payload["bank_transfer"]["bank"], "bni");

        let ewallet_payload = charge(PaymentMethod::EWallet, None).to_snap_payload();
        assert!(ewallet_payload.get("bank_transfer").is_none());
    }

    #[test]
    fn payment_method_parsing() {
        assert_eq!(
            "e_wallet".parse::<PaymentMethod>().unwrap(),
            PaymentMethod::EWallet
        );
        assert_eq!(
            " BANK_TRANSFER ".parse::<PaymentMethod>().unwrap(),
            PaymentMethod::BankTransfer
        );
        assert!("CASH".parse::<PaymentMethod>().is_err());
    }

    #[test]
    fn gateway_status_tolerates_partial_payloads() {
        let status: GatewayStatus = serde_json::from_str(
            r#"{"order_id": "tx-1", "transaction_status": "settlement", "unknown_field": 1}"#,
        )
        .unwrap();
        assert_eq!(status.order_id.as_deref(), Some("tx-1"));
        assert_eq!(status.transaction_status.as_deref(), Some("settlement"));
        assert!(status.va_numbers.is_none());
    }
}
