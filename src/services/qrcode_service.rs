use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, Set};
use sea_orm::ActiveValue::NotSet;
use uuid::Uuid;

use crate::{
    audit,
    dto::qrcode::GenerateQrCodeRequest,
    entity::{
        order_details::{Column as DetailCol, Entity as OrderDetails},
        orders::{Entity as Orders, Model as OrderModel},
        products::Entity as Products,
        qr_codes::{ActiveModel, Column as QrCol, Entity as QrCodes},
        users::Entity as Users,
    },
    error::{AppError, AppResult},
    middleware::auth::{AuthUser, ensure_admin_or_user},
    models::{QrCode, QrCodeDetails, ReceiptItem},
    receipt::{self, ReceiptHolder, ReceiptLine},
    response::{ApiResponse, Meta},
    state::AppState,
};

pub async fn generate_qr_code(
    state: &AppState,
    user: &AuthUser,
    payload: GenerateQrCodeRequest,
) -> AppResult<ApiResponse<QrCode>> {
    ensure_admin_or_user(user)?;
    let order = visible_order(state, user, payload.order_id).await?;

    let existing = QrCodes::find()
        .filter(QrCol::OrderId.eq(order.id))
        .one(&state.orm)
        .await?;
    if existing.is_some() {
        return Err(AppError::Conflict(
            "QR Code for this order already exists".into(),
        ));
    }

    let items = receipt_items(state, order.id).await?;
    // rendered codes carry the holder line too
    if !receipt::fits_qr(&holder_payload(state, &order, &items).await?) {
        return Err(AppError::BadRequest(
            "Order has too many items to fit in a QR code".into(),
        ));
    }
    let data = receipt::build_receipt(order.id, order.total_price, &receipt_lines(&items), None);

    let qr = ActiveModel {
        id: Set(Uuid::new_v4()),
        order_id: Set(order.id),
        data: Set(data),
        created_at: NotSet,
    }
    .insert(&state.orm)
    .await?;

    audit::record(
        &state.pool,
        user.user_id,
        "qrcode_generate",
        "qr_codes",
        serde_json::json!({ "qr_code_id": qr.id, "order_id": order.id }),
    )
    .await;

    Ok(ApiResponse::success(
        "QR Code generated",
        QrCode {
            qr_code_id: qr.id,
            order_id: qr.order_id,
            qr_code_data: qr.data,
        },
        Some(Meta::empty()),
    ))
}

pub async fn get_by_order(
    state: &AppState,
    user: &AuthUser,
    order_id: Uuid,
) -> AppResult<ApiResponse<QrCodeDetails>> {
    let qr = QrCodes::find()
        .filter(QrCol::OrderId.eq(order_id))
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound)?;
    let order = visible_order(state, user, order_id).await?;
    let items = receipt_items(state, order.id).await?;

    Ok(ApiResponse::success(
        "QR Code",
        QrCodeDetails {
            qr_code_id: qr.id,
            order_id: order.id,
            total_price: order.total_price,
            qr_code_data: qr.data,
            items,
        },
        None,
    ))
}

/// SVG of the receipt, with the order holder's name and email added.
pub async fn render_svg(state: &AppState, user: &AuthUser, qr_code_id: Uuid) -> AppResult<String> {
    let qr = QrCodes::find_by_id(qr_code_id)
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound)?;
    let order = visible_order(state, user, qr.order_id).await?;
    let items = receipt_items(state, order.id).await?;

    receipt::render_svg(&holder_payload(state, &order, &items).await?)
}

async fn holder_payload(
    state: &AppState,
    order: &OrderModel,
    items: &[ReceiptItem],
) -> AppResult<String> {
    let holder = Users::find_by_id(order.user_id)
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound)?;

    Ok(receipt::build_receipt(
        order.id,
        order.total_price,
        &receipt_lines(items),
        Some(ReceiptHolder {
            full_name: &holder.full_name,
            email: &holder.email,
        }),
    ))
}

/// Orders of other users are reported as missing.
async fn visible_order(state: &AppState, user: &AuthUser, order_id: Uuid) -> AppResult<OrderModel> {
    Orders::find_by_id(order_id)
        .one(&state.orm)
        .await?
        .filter(|o| o.user_id == user.user_id || user.is_admin())
        .ok_or(AppError::NotFound)
}

async fn receipt_items(state: &AppState, order_id: Uuid) -> AppResult<Vec<ReceiptItem>> {
    let rows = OrderDetails::find()
        .find_also_related(Products)
        .filter(DetailCol::OrderId.eq(order_id))
        .all(&state.orm)
        .await?;

    Ok(rows
        .into_iter()
        .map(|(detail, product)| {
            let (product_name, product_image) = product
                .map(|p| (p.name, p.image))
                .unwrap_or_default();
            ReceiptItem {
                product_id: detail.product_id,
                product_name,
                product_image,
                quantity: detail.quantity,
                sub_total: detail.sub_total,
            }
        })
        .collect())
}

fn receipt_lines(items: &[ReceiptItem]) -> Vec<ReceiptLine> {
    items
        .iter()
        .map(|item| ReceiptLine {
            product_name: item.product_name.clone(),
            quantity: item.quantity,
            sub_total: item.sub_total,
        })
        .collect()
}
