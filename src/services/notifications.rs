use async_trait::async_trait;
use log::info;
use serde::Serialize;

use crate::error::MailError;
use crate::models::{Actor, InventoryItem};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OutboundMail {
    pub to: String,
    pub subject: String,
    pub body: String,
}

/// Outbound mail collaborator. Delivery is owned by the implementation.
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, mail: &OutboundMail) -> Result<(), MailError>;
}

/// Writes the payload to the log instead of delivering it.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, mail: &OutboundMail) -> Result<(), MailError> {
        info!("mail to {}: {}\n{}", mail.to, mail.subject, mail.body);
        Ok(())
    }
}

pub fn item_link(base_url: &str, item_id: &str) -> String {
    format!(
        "{}/inventory?item={}",
        base_url.trim_end_matches('/'),
        urlencoding::encode(item_id)
    )
}

/// Approval request for a reorder or repair that is now waiting on a manager.
pub fn approval_request(
    item: &InventoryItem,
    requested_by: &Actor,
    recipient: &str,
    base_url: &str,
) -> OutboundMail {
    let (kind, detail) = match item.kind.equipment() {
        Some(equipment) => (
            "Repair",
            format!(
                "Reported issue: {}",
                equipment.repair_issue.as_deref().unwrap_or("(none given)")
            ),
        ),
        None => (
            "Reorder",
            format!("Requested quantity: {}", item.requested_quantity.unwrap_or(1)),
        ),
    };

    let body = format!(
        "{kind} request for {name} ({id})\n\
         Requested by: {who}\n\
         Location: {location}\n\
         {detail}\n\n\
         Review and approve: {link}\n",
        kind = kind,
        name = item.name,
        id = item.item_id,
        who = requested_by.activity_name(),
        location = item.location,
        detail = detail,
        link = item_link(base_url, &item.item_id),
    );

    OutboundMail {
        to: recipient.to_string(),
        subject: format!("[Lab] {} request: {} ({})", kind, item.name, item.item_id),
        body,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{EquipmentState, EquipmentStatus, ItemKind, ItemStatus, StockLevels};

    fn item(kind: ItemKind) -> InventoryItem {
        InventoryItem {
            id: "doc-1".into(),
            rev: 1,
            item_id: "LAB-1000".into(),
            name: "Nitrile gloves (M)".into(),
            barcode: None,
            location: "Cabinet 3".into(),
            owner: None,
            status: ItemStatus::Requested,
            kind,
            requested_quantity: Some(4),
            last_received: None,
            requested_at: None,
            ordered_at: None,
            repaired_at: None,
            notes: Vec::new(),
            images: Vec::new(),
            image: None,
        }
    }

    #[test]
    fn reorder_mail_names_item_quantity_and_link() {
        let mail = approval_request(
            &item(ItemKind::General(StockLevels { stock: 1, min_stock: 5 })),
            &Actor::user("Dana Reyes"),
            "pi@lab.org",
            "https://lab.example.org/",
        );

        assert_eq!(mail.to, "pi@lab.org");
        assert_eq!(mail.subject, "[Lab] Reorder request: Nitrile gloves (M) (LAB-1000)");
        assert!(mail.body.contains("Requested quantity: 4"));
        assert!(mail.body.contains("Requested by: Dana Reyes"));
        assert!(mail.body.contains("https://lab.example.org/inventory?item=LAB-1000"));
    }

    #[test]
    fn repair_mail_carries_the_reported_issue() {
        let mail = approval_request(
            &item(ItemKind::Equipment(EquipmentState {
                equipment_status: EquipmentStatus::Finicky,
                repair_issue: Some("rotor wobbles".into()),
            })),
            &Actor::Anonymous,
            "pi@lab.org",
            "http://localhost:3000",
        );

        assert!(mail.subject.starts_with("[Lab] Repair request"));
        assert!(mail.body.contains("Reported issue: rotor wobbles"));
        assert!(mail.body.contains("Requested by: Unknown"));
    }

    #[test]
    fn item_link_encodes_the_code() {
        assert_eq!(item_link("http://x", "A B"), "http://x/inventory?item=A%20B");
    }
}
