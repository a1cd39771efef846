//! # Domain Transforms
//!
//! Pure functions from backend records to display-ready records. No I/O, no
//! clock reads: anything time-relative takes `now` as an argument.
//!
//! Two steps per entity:
//!
//! ```text
//! wire record ──normalize()──▶ wire record (defaults applied, idempotent)
//!             ──*_row()──────▶ display row (labels, badges, formatted values)
//! ```

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::Serialize;

use crate::AgentRole;
use crate::api::types::{
    Customer, InventoryItem, Order, ReturnRequest, Vehicle, WireConversation, WireMessage, Worker,
};
use crate::core::conversation::{Conversation, ConversationSummary, Message, MessageRole};

/// Items at or below this quantity count as low stock when the record has
/// no reorder level of its own.
pub const DEFAULT_REORDER_LEVEL: i64 = 10;

pub const TITLE_MAX_CHARS: usize = 50;
pub const PREVIEW_MAX_CHARS: usize = 80;
const NOT_AVAILABLE: &str = "N/A";

// ============================================================================
// Formatting helpers
// ============================================================================

/// `1234.5` → `"$1,234.50"`, `-5.0` → `"-$5.00"`.
pub fn format_currency(amount: f64) -> String {
    let cents = (amount.abs() * 100.0).round() as u64;
    let whole = (cents / 100).to_string();
    let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
    for (i, c) in whole.chars().enumerate() {
        if i > 0 && (whole.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }
    let sign = if amount < 0.0 && cents > 0 { "-" } else { "" };
    format!("{sign}${grouped}.{:02}", cents % 100)
}

/// `"just now"`, `"5m ago"`, `"3h ago"`, `"2d ago"`, then a calendar date.
/// Timestamps in the future read as `"just now"`.
pub fn format_relative_time(ts: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let secs = (now - ts).num_seconds();
    match secs {
        s if s < 60 => "just now".to_string(),
        s if s < 3_600 => format!("{}m ago", s / 60),
        s if s < 86_400 => format!("{}h ago", s / 3_600),
        s if s < 7 * 86_400 => format!("{}d ago", s / 86_400),
        _ => ts.format("%b %-d, %Y").to_string(),
    }
}

/// Lowercase, trimmed, with spaces and hyphens folded to underscores.
pub fn normalize_status(status: &str) -> String {
    status
        .trim()
        .to_lowercase()
        .chars()
        .map(|c| if c == ' ' || c == '-' { '_' } else { c })
        .collect()
}

/// `"in_transit"` → `"In Transit"`.
pub fn status_label(status: &str) -> String {
    normalize_status(status)
        .split('_')
        .filter(|w| !w.is_empty())
        .map(|w| {
            let mut chars = w.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// CSS class for a status badge.
pub fn status_badge(status: &str) -> &'static str {
    match normalize_status(status).as_str() {
        "delivered" | "completed" | "active" | "available" | "approved" | "refunded"
        | "in_stock" => "badge-success",
        "pending" | "processing" | "low_stock" | "requested" => "badge-warning",
        "shipped" | "in_transit" | "on_route" | "picking" | "packing" => "badge-info",
        "cancelled" | "rejected" | "out_of_stock" | "maintenance" | "inactive" | "failed" => {
            "badge-danger"
        }
        _ => "badge-secondary",
    }
}

/// Parses RFC 3339, or a naive ISO timestamp taken as UTC.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%.f"))
        .ok()
        .map(|naive| naive.and_utc())
}

/// Backend ids arrive as strings or integers.
pub fn id_string(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        serde_json::Value::Number(n) => n.to_string(),
        _ => String::new(),
    }
}

/// First line of `text`, cut to `max` characters with a trailing `...`.
pub fn truncate_line(text: &str, max: usize) -> String {
    let line = text.lines().next().unwrap_or("").trim();
    if line.chars().count() > max {
        let cut: String = line.chars().take(max.saturating_sub(3)).collect();
        format!("{cut}...")
    } else {
        line.to_string()
    }
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

fn clean(value: Option<String>) -> Option<String> {
    value
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

fn relative_or_na(raw: &Option<String>, now: DateTime<Utc>) -> String {
    raw.as_deref()
        .and_then(parse_timestamp)
        .map(|ts| format_relative_time(ts, now))
        .unwrap_or_else(|| NOT_AVAILABLE.to_string())
}

// ============================================================================
// Conversations
// ============================================================================

fn message_role(raw: Option<&str>) -> Option<MessageRole> {
    match raw.map(|r| r.trim().to_lowercase()).as_deref() {
        Some("user" | "human") => Some(MessageRole::User),
        Some("assistant" | "bot" | "ai") => Some(MessageRole::Assistant),
        _ => None,
    }
}

/// Maps a wire message. System and unknown roles are dropped. `index` is its
/// position in the history, used for an id when the backend sends none.
pub fn message_from_wire(wire: &WireMessage, index: usize) -> Option<Message> {
    let role = message_role(wire.role.as_deref())?;
    let id = wire
        .id
        .as_ref()
        .map(id_string)
        .filter(|id| !id.is_empty())
        .unwrap_or_else(|| format!("msg-{index}"));
    let created_at = wire
        .created_at
        .as_deref()
        .and_then(parse_timestamp)
        .unwrap_or(DateTime::<Utc>::UNIX_EPOCH);
    Some(Message {
        id,
        role,
        content: wire.content.clone().unwrap_or_default(),
        created_at,
    })
}

pub fn messages_from_wire(wire: &[WireMessage]) -> Vec<Message> {
    wire.iter()
        .enumerate()
        .filter_map(|(i, m)| message_from_wire(m, i))
        .collect()
}

pub fn summary_from_wire(wire: &WireConversation) -> ConversationSummary {
    let messages = messages_from_wire(&wire.messages);

    let title = non_blank(&wire.title)
        .map(|t| truncate_line(t, TITLE_MAX_CHARS))
        .or_else(|| {
            messages
                .iter()
                .find(|m| m.role == MessageRole::User)
                .map(|m| truncate_line(&m.content, TITLE_MAX_CHARS))
        })
        .filter(|t| !t.is_empty())
        .unwrap_or_else(|| "New conversation".to_string());

    let last_message = non_blank(&wire.last_message)
        .map(str::to_string)
        .or_else(|| messages.last().map(|m| m.content.clone()))
        .map(|m| truncate_line(&m, PREVIEW_MAX_CHARS))
        .unwrap_or_default();

    let last_activity = wire
        .updated_at
        .as_deref()
        .and_then(parse_timestamp)
        .or_else(|| messages.last().map(|m| m.created_at));

    ConversationSummary {
        id: id_string(&wire.id),
        role: wire
            .role
            .as_deref()
            .and_then(AgentRole::parse)
            .unwrap_or_default(),
        title,
        last_message,
        message_count: wire.message_count.unwrap_or(messages.len()),
        last_activity,
    }
}

pub fn conversation_from_wire(wire: &WireConversation) -> Conversation {
    Conversation {
        summary: summary_from_wire(wire),
        owner: clean(wire.user_id.clone()),
        messages: messages_from_wire(&wire.messages),
    }
}

// ============================================================================
// WMS records
// ============================================================================

/// Applies defaults and canonical forms to a raw record. Idempotent:
/// `x.normalize().normalize() == x.normalize()`.
pub trait Normalize: Sized {
    fn normalize(self) -> Self;
}

impl Normalize for InventoryItem {
    fn normalize(self) -> Self {
        Self {
            sku: self.sku.trim().to_uppercase(),
            name: self.name.trim().to_string(),
            quantity: self.quantity.max(0),
            location: clean(self.location),
            reorder_level: self.reorder_level.map(|l| l.max(0)),
            unit_price: self.unit_price.filter(|p| p.is_finite()),
            ..self
        }
    }
}

impl Normalize for Order {
    fn normalize(self) -> Self {
        Self {
            order_number: clean(self.order_number),
            customer_name: clean(self.customer_name),
            status: clean(self.status).map(|s| normalize_status(&s)),
            total_amount: self.total_amount.filter(|a| a.is_finite()),
            created_at: clean(self.created_at),
            ..self
        }
    }
}

impl Normalize for ReturnRequest {
    fn normalize(self) -> Self {
        Self {
            reason: clean(self.reason),
            status: clean(self.status).map(|s| normalize_status(&s)),
            refund_amount: self.refund_amount.filter(|a| a.is_finite()),
            created_at: clean(self.created_at),
            ..self
        }
    }
}

impl Normalize for Vehicle {
    fn normalize(self) -> Self {
        Self {
            license_plate: clean(self.license_plate).map(|p| p.to_uppercase()),
            vehicle_type: clean(self.vehicle_type),
            status: clean(self.status).map(|s| normalize_status(&s)),
            capacity: self.capacity.filter(|c| c.is_finite() && *c >= 0.0),
            driver_name: clean(self.driver_name),
            ..self
        }
    }
}

impl Normalize for Worker {
    fn normalize(self) -> Self {
        Self {
            name: clean(self.name),
            role: clean(self.role).map(|r| r.to_lowercase()),
            shift: clean(self.shift),
            ..self
        }
    }
}

impl Normalize for Customer {
    fn normalize(self) -> Self {
        Self {
            name: clean(self.name),
            email: clean(self.email).map(|e| e.to_lowercase()),
            phone: clean(self.phone),
            address: clean(self.address),
            ..self
        }
    }
}

#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct InventoryRow {
    pub id: Option<i64>,
    pub sku: String,
    pub name: String,
    pub quantity: i64,
    pub location: String,
    pub stock_status: String,
    pub badge: &'static str,
    pub unit_price: String,
    pub total_value: String,
}

pub fn inventory_row(item: &InventoryItem) -> InventoryRow {
    let item = item.clone().normalize();
    let reorder = item.reorder_level.unwrap_or(DEFAULT_REORDER_LEVEL);
    let stock = if item.quantity == 0 {
        "out_of_stock"
    } else if item.quantity <= reorder {
        "low_stock"
    } else {
        "in_stock"
    };
    InventoryRow {
        id: item.id,
        sku: item.sku,
        name: item.name,
        quantity: item.quantity,
        location: item.location.unwrap_or_else(|| "Unassigned".to_string()),
        stock_status: status_label(stock),
        badge: status_badge(stock),
        unit_price: item
            .unit_price
            .map(format_currency)
            .unwrap_or_else(|| NOT_AVAILABLE.to_string()),
        total_value: item
            .unit_price
            .map(|p| format_currency(p * item.quantity as f64))
            .unwrap_or_else(|| NOT_AVAILABLE.to_string()),
    }
}

#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct OrderRow {
    pub id: Option<i64>,
    pub order_number: String,
    pub customer: String,
    pub status: String,
    pub badge: &'static str,
    pub total: String,
    pub item_count: usize,
    pub placed: String,
}

pub fn order_row(order: &Order, now: DateTime<Utc>) -> OrderRow {
    let order = order.clone().normalize();
    let status = order.status.unwrap_or_else(|| "pending".to_string());
    OrderRow {
        id: order.id,
        order_number: order
            .order_number
            .or_else(|| order.id.map(|id| format!("ORD-{id:05}")))
            .unwrap_or_else(|| NOT_AVAILABLE.to_string()),
        customer: order
            .customer_name
            .unwrap_or_else(|| "Unknown customer".to_string()),
        badge: status_badge(&status),
        status: status_label(&status),
        total: format_currency(order.total_amount.unwrap_or(0.0)),
        item_count: order.items.len(),
        placed: relative_or_na(&order.created_at, now),
    }
}

#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ReturnRow {
    pub id: Option<i64>,
    pub order_ref: String,
    pub reason: String,
    pub status: String,
    pub badge: &'static str,
    pub refund: String,
    pub requested: String,
}

pub fn return_row(ret: &ReturnRequest, now: DateTime<Utc>) -> ReturnRow {
    let ret = ret.clone().normalize();
    let status = ret.status.unwrap_or_else(|| "requested".to_string());
    ReturnRow {
        id: ret.id,
        order_ref: ret
            .order_id
            .map(|id| format!("#{id}"))
            .unwrap_or_else(|| NOT_AVAILABLE.to_string()),
        reason: ret.reason.unwrap_or_else(|| "No reason given".to_string()),
        badge: status_badge(&status),
        status: status_label(&status),
        refund: ret
            .refund_amount
            .map(format_currency)
            .unwrap_or_else(|| NOT_AVAILABLE.to_string()),
        requested: relative_or_na(&ret.created_at, now),
    }
}

#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct VehicleRow {
    pub id: Option<i64>,
    pub plate: String,
    pub kind: String,
    pub status: String,
    pub badge: &'static str,
    pub capacity: String,
    pub driver: String,
}

pub fn vehicle_row(vehicle: &Vehicle) -> VehicleRow {
    let vehicle = vehicle.clone().normalize();
    let status = vehicle.status.unwrap_or_else(|| "available".to_string());
    VehicleRow {
        id: vehicle.id,
        plate: vehicle
            .license_plate
            .unwrap_or_else(|| NOT_AVAILABLE.to_string()),
        kind: vehicle
            .vehicle_type
            .map(|t| status_label(&t))
            .unwrap_or_else(|| "Vehicle".to_string()),
        badge: status_badge(&status),
        status: status_label(&status),
        capacity: vehicle
            .capacity
            .map(|c| format!("{c:.0} kg"))
            .unwrap_or_else(|| NOT_AVAILABLE.to_string()),
        driver: vehicle
            .driver_name
            .unwrap_or_else(|| "Unassigned".to_string()),
    }
}

#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct WorkerRow {
    pub id: Option<i64>,
    pub name: String,
    pub role: String,
    pub shift: String,
    pub status: String,
    pub badge: &'static str,
}

pub fn worker_row(worker: &Worker) -> WorkerRow {
    let worker = worker.clone().normalize();
    let status = if worker.is_active.unwrap_or(true) { "active" } else { "inactive" };
    WorkerRow {
        id: worker.id,
        name: worker.name.unwrap_or_else(|| "Unnamed".to_string()),
        role: worker
            .role
            .as_deref()
            .map(|r| match AgentRole::parse(r) {
                Some(role) => role.label().to_string(),
                None => status_label(r),
            })
            .unwrap_or_else(|| NOT_AVAILABLE.to_string()),
        shift: worker.shift.unwrap_or_else(|| NOT_AVAILABLE.to_string()),
        status: status_label(status),
        badge: status_badge(status),
    }
}

#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CustomerRow {
    pub id: Option<i64>,
    pub name: String,
    pub email: String,
    pub phone: String,
    pub address: String,
}

pub fn customer_row(customer: &Customer) -> CustomerRow {
    let customer = customer.clone().normalize();
    CustomerRow {
        id: customer.id,
        name: customer.name.unwrap_or_else(|| "Unnamed".to_string()),
        email: customer.email.unwrap_or_else(|| NOT_AVAILABLE.to_string()),
        phone: customer.phone.unwrap_or_else(|| NOT_AVAILABLE.to_string()),
        address: customer.address.unwrap_or_else(|| NOT_AVAILABLE.to_string()),
    }
}
