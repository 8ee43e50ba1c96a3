use serde::Deserialize;

use stockroom_inventory::{
    ApprovalStatus, CartItem, ItemPatch, NewItem, NewRequest,
};

// -------------------------
// Request DTOs
// -------------------------

#[derive(Debug, Deserialize)]
pub struct CreateItemRequest {
    pub name: String,
    pub category: Option<String>,
    pub quantity: Option<i64>,
    pub notes: Option<String>,
    pub image_url: Option<String>,
}

impl From<CreateItemRequest> for NewItem {
    fn from(body: CreateItemRequest) -> Self {
        NewItem {
            name: body.name,
            category: body.category,
            quantity: body.quantity,
            notes: body.notes,
            image_url: body.image_url,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct UpdateItemRequest {
    pub name: Option<String>,
    pub category: Option<String>,
    pub quantity: Option<i64>,
    pub notes: Option<String>,
    pub image_url: Option<String>,
}

impl From<UpdateItemRequest> for ItemPatch {
    fn from(body: UpdateItemRequest) -> Self {
        ItemPatch {
            name: body.name,
            category: body.category,
            quantity: body.quantity,
            notes: body.notes,
            image_url: body.image_url,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct SubmitRequestBody {
    pub user_id: String,
    pub lines: Vec<CartItem>,
    pub purpose: Option<String>,
    pub duration_days: Option<i64>,
}

impl From<SubmitRequestBody> for NewRequest {
    fn from(body: SubmitRequestBody) -> Self {
        NewRequest {
            user_id: body.user_id,
            lines: body.lines,
            purpose: body.purpose,
            duration_days: body.duration_days,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct UpdateStatusBody {
    pub status: ApprovalStatus,
}
