use std::collections::HashMap;

use base64::{Engine, engine::general_purpose::STANDARD};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, QueryOrder, Set,
    ActiveValue::NotSet,
};
use uuid::Uuid;

use crate::{
    dto::listings::ImageUpload,
    entity::{
        Images, ListingImages,
        images::{ActiveModel as ImageActive, Column as ImageCol, Model as ImageModel},
        listing_images::{ActiveModel as LinkActive, Column as LinkCol},
    },
    error::{AppError, AppResult},
    models::Image,
    state::AppState,
};

/// Persist uploads as base64 rows and return their ids in upload order.
pub async fn store_images<C: ConnectionTrait>(
    conn: &C,
    uploads: Vec<ImageUpload>,
) -> AppResult<Vec<Uuid>> {
    let mut ids = Vec::with_capacity(uploads.len());
    for upload in uploads {
        let image = ImageActive {
            id: Set(Uuid::new_v4()),
            data: Set(STANDARD.encode(&upload.bytes)),
            content_type: Set(upload.content_type),
            filename: Set(upload.filename),
            created_at: NotSet,
        }
        .insert(conn)
        .await?;
        ids.push(image.id);
    }
    Ok(ids)
}

pub async fn link_images<C: ConnectionTrait>(
    conn: &C,
    listing_id: Uuid,
    image_ids: &[Uuid],
) -> AppResult<()> {
    if image_ids.is_empty() {
        return Ok(());
    }
    let links = image_ids.iter().enumerate().map(|(position, image_id)| LinkActive {
        listing_id: Set(listing_id),
        image_id: Set(*image_id),
        position: Set(position as i32),
    });
    ListingImages::insert_many(links)
        .exec_without_returning(conn)
        .await?;
    Ok(())
}

pub async fn image_ids_for_listing<C: ConnectionTrait>(
    conn: &C,
    listing_id: Uuid,
) -> AppResult<Vec<Uuid>> {
    let ids = ListingImages::find()
        .filter(LinkCol::ListingId.eq(listing_id))
        .order_by_asc(LinkCol::Position)
        .all(conn)
        .await?
        .into_iter()
        .map(|link| link.image_id)
        .collect();
    Ok(ids)
}

/// Delete image rows; their listing links go with them.
pub async fn delete_images<C: ConnectionTrait>(conn: &C, image_ids: &[Uuid]) -> AppResult<u64> {
    if image_ids.is_empty() {
        return Ok(0);
    }
    let result = Images::delete_many()
        .filter(ImageCol::Id.is_in(image_ids.to_vec()))
        .exec(conn)
        .await?;
    Ok(result.rows_affected)
}

/// Images of each listing, in upload order.
pub async fn images_for_listings<C: ConnectionTrait>(
    conn: &C,
    listing_ids: &[Uuid],
) -> AppResult<HashMap<Uuid, Vec<Image>>> {
    let mut out: HashMap<Uuid, Vec<Image>> = HashMap::new();
    if listing_ids.is_empty() {
        return Ok(out);
    }

    let links = ListingImages::find()
        .filter(LinkCol::ListingId.is_in(listing_ids.to_vec()))
        .order_by_asc(LinkCol::ListingId)
        .order_by_asc(LinkCol::Position)
        .all(conn)
        .await?;
    if links.is_empty() {
        return Ok(out);
    }

    let image_ids: Vec<Uuid> = links.iter().map(|l| l.image_id).collect();
    let mut images: HashMap<Uuid, ImageModel> = Images::find()
        .filter(ImageCol::Id.is_in(image_ids))
        .all(conn)
        .await?
        .into_iter()
        .map(|img| (img.id, img))
        .collect();

    for link in links {
        if let Some(image) = images.remove(&link.image_id) {
            out.entry(link.listing_id)
                .or_default()
                .push(image_from_entity(image));
        }
    }
    Ok(out)
}

/// Decoded bytes and content type of a stored image.
pub async fn get_image(state: &AppState, id: Uuid) -> AppResult<(String, Vec<u8>)> {
    let image = Images::find_by_id(id)
        .one(&state.orm)
        .await?
        .ok_or_else(|| AppError::not_found("Image"))?;
    let bytes = STANDARD
        .decode(image.data.as_bytes())
        .map_err(|e| AppError::Internal(anyhow::anyhow!("corrupt image {id}: {e}")))?;
    Ok((image.content_type, bytes))
}

fn image_from_entity(model: ImageModel) -> Image {
    Image {
        id: model.id,
        data: model.data,
        content_type: model.content_type,
        filename: model.filename,
    }
}
