//! Receipt text embedded in order QR codes.

use qrcode::{EcLevel, QrCode, render::svg};
use uuid::Uuid;

use crate::error::{AppError, AppResult};

/// Pixel size of one QR module in rendered SVGs.
const MODULE_PX: u32 = 5;

#[derive(Debug, Clone)]
pub struct ReceiptLine {
    pub product_name: String,
    pub quantity: i32,
    pub sub_total: i64,
}

/// Name and email printed under the order id on rendered receipts.
#[derive(Debug, Clone)]
pub struct ReceiptHolder<'a> {
    pub full_name: &'a str,
    pub email: &'a str,
}

pub fn build_receipt(
    order_id: Uuid,
    total_price: i64,
    lines: &[ReceiptLine],
    holder: Option<ReceiptHolder<'_>>,
) -> String {
    let mut out = format!("OrderId: {order_id}\n");
    if let Some(holder) = holder {
        out.push_str(&format!("User: {} ({})\n", holder.full_name, holder.email));
    }
    out.push_str(&format!("Total: {total_price}\nOrder Details:\n"));
    for line in lines {
        out.push_str(&format!(
            "- {} x{}: {}\n",
            line.product_name, line.quantity, line.sub_total
        ));
    }
    out
}

/// Whether `payload` fits in a single QR code at error-correction level Q.
pub fn fits_qr(payload: &str) -> bool {
    QrCode::with_error_correction_level(payload.as_bytes(), EcLevel::Q).is_ok()
}

/// Encode `payload` as an SVG QR code at error-correction level Q.
pub fn render_svg(payload: &str) -> AppResult<String> {
    let code = QrCode::with_error_correction_level(payload.as_bytes(), EcLevel::Q)
        .map_err(|e| AppError::Internal(anyhow::anyhow!("receipt cannot be encoded: {e}")))?;

    Ok(code
        .render::<svg::Color<'_>>()
        .module_dimensions(MODULE_PX, MODULE_PX)
        .build())
}
