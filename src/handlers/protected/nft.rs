// handlers/protected/nft.rs - NFT lifecycle of a post
//
// POST /api/nft/mint - owner mints once
// POST /api/nft/list - owner lists a minted post for sale once
// POST /api/nft/buy  - any other user buys a listed, unsold post
//
// The state only moves forward: unminted → minted → listed → sold.

use axum::{extract::State, Extension};
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::info;

use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult, AuthUser, JsonBody};
use crate::models::{now_ms, NftListing, NftStatus, Post};
use crate::mutation::{update_doc, MutationPlan};
use crate::ownership::fetch_owned_as;
use crate::paths::{self, PostRef};
use crate::state::AppState;
use crate::store::{get_as, FieldUpdate};

use super::posts::PostDocRequest;
use super::validate;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MintRequest {
    pub post_doc_path: String,
    pub metadata_link: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListRequest {
    pub post_doc_path: String,
    pub price: Decimal,
    pub currency: String,
}

fn status_update(status: &NftStatus) -> Result<FieldUpdate, ApiError> {
    let value = serde_json::to_value(status).map_err(|e| ApiError::internal_server_error(e.to_string()))?;
    Ok(FieldUpdate::set("nftStatus", value))
}

/// POST /api/nft/mint
pub async fn mint(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    JsonBody(body): JsonBody<MintRequest>,
) -> ApiResult<Value> {
    let post_ref = PostRef::parse(&body.post_doc_path)?;
    let metadata_link = validate::any_url("metadataLink", &body.metadata_link)?;

    let status = state
        .locks
        .acquire(format!("nftMint-{}", user.username), async {
            let store = state.store();
            let post: Post =
                fetch_owned_as(store, &post_ref.path, "senderUsername", &user.username, ApiError::NotOwner).await?;
            if post.nft_status.minted {
                return Err(ApiError::validation("Post is already minted"));
            }

            let status = NftStatus {
                minted: true,
                metadata_link: Some(metadata_link),
                listing: None,
            };
            MutationPlan::new("nftMint")
                .step("setNftStatus", update_doc(store, post_ref.path.clone(), vec![status_update(&status)?]))
                .step(
                    "incrementNftCount",
                    update_doc(store, paths::user(&user.username)?, vec![FieldUpdate::increment("nftCount", 1)]),
                )
                .run_parallel()
                .await
                .into_result()?;
            Ok(status)
        })
        .await?;

    info!(username = %user.username, path = %post_ref.path, "post minted");
    Ok(ApiResponse::success(json!({ "nftStatus": status })))
}

/// POST /api/nft/list
pub async fn list(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    JsonBody(body): JsonBody<ListRequest>,
) -> ApiResult<Value> {
    let post_ref = PostRef::parse(&body.post_doc_path)?;
    if body.price <= Decimal::ZERO {
        return Err(ApiError::invalid_field("price", "price must be greater than zero"));
    }
    let currency = validate::currency(&body.currency)?;

    let status = state
        .locks
        .acquire(format!("nftList-{}", user.username), async {
            let store = state.store();
            let post: Post =
                fetch_owned_as(store, &post_ref.path, "senderUsername", &user.username, ApiError::NotOwner).await?;
            if !post.nft_status.minted {
                return Err(ApiError::validation("Post must be minted before listing"));
            }
            if post.nft_status.listing.is_some() {
                return Err(ApiError::validation("Post is already listed"));
            }

            let mut status = post.nft_status;
            status.listing = Some(NftListing {
                price: body.price,
                currency,
                sold: false,
                buyer: None,
                listed_at: now_ms(),
            });
            store.update(&post_ref.path, vec![status_update(&status)?]).await?;
            Ok(status)
        })
        .await?;

    info!(username = %user.username, path = %post_ref.path, price = %body.price, "nft listed");
    Ok(ApiResponse::success(json!({ "nftStatus": status })))
}

/// POST /api/nft/buy - keyed on the post so concurrent buyers serialize
pub async fn buy(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    JsonBody(body): JsonBody<PostDocRequest>,
) -> ApiResult<Value> {
    let post_ref = PostRef::parse(&body.post_doc_path)?;

    let status = state
        .locks
        .acquire(format!("nftBuy-{}", post_ref.path), async {
            let store = state.store();
            let post: Post = get_as(store, &post_ref.path)
                .await?
                .ok_or_else(|| ApiError::not_found(format!("{} not found", post_ref.path)))?;

            let mut status = post.nft_status;
            let listing = match status.listing.as_mut() {
                Some(listing) => listing,
                None => return Err(ApiError::validation("Post is not listed for sale")),
            };
            if listing.sold {
                return Err(ApiError::validation("NFT is already sold"));
            }
            if post.sender_username == user.username {
                return Err(ApiError::forbidden("You cannot buy your own NFT"));
            }

            listing.sold = true;
            listing.buyer = Some(user.username.clone());
            store.update(&post_ref.path, vec![status_update(&status)?]).await?;
            Ok(status)
        })
        .await?;

    info!(username = %user.username, path = %post_ref.path, "nft bought");
    Ok(ApiResponse::success(json!({ "nftStatus": status })))
}
