//! Apply a verified postback to the host order

use tracing::{error, info, warn};

use crate::error::AppResult;
use crate::orders::{OrderStore, PaymentInfo, Transition};
use crate::payments::providers::icepay::postback::{IcepayStatus, Postback, Verified};
use crate::payments::types::PostbackOutcome;

pub const LOG_ACTION_TYPE: &str = "icepay.postback";

/// Branch on the reported status and move the order accordingly.
///
/// Only `OK` may mark an order paid. `REFUND` and `CBACK` refund a paid
/// order. Every other status leaves the order as it is.
pub async fn reconcile(
    store: &dyn OrderStore,
    provider: &str,
    merchant_id: &str,
    postback: &Postback<Verified>,
) -> AppResult<PostbackOutcome> {
    let merchant = postback.merchant();
    if !merchant.is_empty() && merchant != merchant_id {
        info!("Postback for merchant {} ignored", merchant);
        return Ok(PostbackOutcome::ForeignMerchant {
            merchant: merchant.to_string(),
        });
    }

    let reference = postback.reference();
    let order = match store.find_by_code(reference).await? {
        Some(order) if !reference.is_empty() => order,
        _ => {
            warn!(
                "Postback references unknown order '{}' (OrderID {})",
                reference,
                postback.order_id()
            );
            return Ok(PostbackOutcome::UnknownOrder {
                reference: reference.to_string(),
            });
        }
    };

    if !postback
        .order_id()
        .strip_prefix(&format!("{}-", order.id))
        .is_some_and(|attempt| attempt.parse::<u32>().is_ok())
    {
        warn!(
            "Postback OrderID '{}' does not belong to order {} (id {})",
            postback.order_id(),
            order.code,
            order.id
        );
    }

    store
        .log_action(&order.code, LOG_ACTION_TYPE, postback.log_data())
        .await?;

    let status = postback.status();
    let payment_id = postback.payment_id().to_string();
    let transaction_id = postback.transaction_id().to_string();
    let reported = status.to_string();
    // Bookkeeping only; it must not hold up the status transition.
    if let Err(e) = store
        .update_payment_info(
            &order.code,
            Box::new(move |info: &mut PaymentInfo| {
                if !payment_id.is_empty() {
                    info.payment_id = Some(payment_id);
                }
                if !transaction_id.is_empty() {
                    info.transaction_id = Some(transaction_id);
                }
                info.status = Some(reported);
            }),
        )
        .await
    {
        warn!("Could not record ICEPAY postback on order {}: {}", order.code, e);
    }

    match &status {
        IcepayStatus::Ok => match store.mark_paid(&order.code, provider).await {
            Ok(Transition::Applied(order)) => Ok(PostbackOutcome::Paid { order }),
            Ok(Transition::AlreadyApplied(order)) => {
                info!("Order {} already paid, postback is a repeat", order.code);
                Ok(PostbackOutcome::AlreadyPaid { order })
            }
            Ok(Transition::Ignored(order)) => {
                error!(
                    "Payment received for order {} in status {}, needs manual refund",
                    order.code, order.status
                );
                Ok(PostbackOutcome::Ignored {
                    order,
                    status: status.to_string(),
                })
            }
            Err(e) if e.is_quota_exceeded() => {
                error!(
                    "Order {} was paid but cannot be confirmed: {}",
                    order.code, e
                );
                Ok(PostbackOutcome::QuotaExceeded {
                    order,
                    message: e.to_string(),
                })
            }
            Err(e) => Err(e),
        },
        IcepayStatus::Refund | IcepayStatus::Chargeback => {
            match store.mark_refunded(&order.code).await? {
                Transition::Applied(order) | Transition::AlreadyApplied(order) => {
                    info!("Order {} refunded ({})", order.code, status);
                    Ok(PostbackOutcome::Refunded { order })
                }
                Transition::Ignored(order) => {
                    warn!(
                        "{} reported for order {} in status {}, nothing to refund",
                        status, order.code, order.status
                    );
                    Ok(PostbackOutcome::Ignored {
                        order,
                        status: status.to_string(),
                    })
                }
            }
        }
        other => {
            info!(
                "Payment for order {} not completed: {} ({})",
                order.code,
                other,
                postback.status_code()
            );
            Ok(PostbackOutcome::NotPaid {
                order,
                status: other.to_string(),
            })
        }
    }
}
