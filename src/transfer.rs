use yt_data_client::{ApiError, MAX_PAGE_SIZE, Rating, VideoId, VideoRatings};

#[derive(Debug, thiserror::Error)]
pub enum TransferError {
    #[error("error fetching liked videos: {0}")]
    Listing(#[source] ApiError),
}

/// Outcome of a transfer run. Failed items are reported here but never turn
/// the run itself into an error.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct TransferSummary {
    /// Liked videos found on the source account.
    pub found: usize,
    /// Videos successfully liked on the target account.
    pub liked: usize,
    /// Videos the target account failed to like, with the error text.
    pub failed: Vec<(VideoId, String)>,
}

/// Collect every video the source account has liked, following continuation
/// tokens until the listing is exhausted.
///
/// Identifiers are kept in the order the API returned them and are not
/// deduplicated.
pub async fn collect_liked_videos<S>(source: &S) -> Result<Vec<VideoId>, ApiError>
where
    S: VideoRatings + ?Sized,
{
    let mut liked_videos = Vec::new();
    let mut page_token: Option<String> = None;

    loop {
        let page = source
            .list_rated_videos(Rating::Like, MAX_PAGE_SIZE, page_token.as_deref())
            .await?;

        tracing::debug!(
            page_items = page.items.len(),
            total_so_far = liked_videos.len() + page.items.len(),
            "Fetched page of liked videos"
        );

        page_token = page.continuation().map(str::to_owned);
        liked_videos.extend(page.items.into_iter().map(|video| video.id));

        if page_token.is_none() {
            break;
        }
    }

    Ok(liked_videos)
}

/// Like each video on the target account in order, logging and skipping
/// failures.
pub async fn replay_likes<T>(target: &T, video_ids: &[VideoId]) -> TransferSummary
where
    T: VideoRatings + ?Sized,
{
    let total = video_ids.len();
    let mut summary = TransferSummary {
        found: total,
        ..Default::default()
    };

    for (i, video_id) in video_ids.iter().enumerate() {
        match target.rate_video(video_id, Rating::Like).await {
            Ok(()) => {
                summary.liked += 1;
                tracing::info!("Liked video {}/{}: {}", i + 1, total, video_id);
            }
            Err(e) => {
                tracing::warn!("Error liking video {}: {}", video_id, e);
                summary.failed.push((video_id.clone(), e.to_string()));
            }
        }
    }

    summary
}

/// Copy every like from `source` to `target`.
///
/// Only a failed listing request aborts the run; individual rating failures
/// are logged and skipped.
pub async fn transfer_likes<S, T>(source: &S, target: &T) -> Result<TransferSummary, TransferError>
where
    S: VideoRatings + ?Sized,
    T: VideoRatings + ?Sized,
{
    let liked_videos = collect_liked_videos(source)
        .await
        .map_err(TransferError::Listing)?;

    tracing::info!("Found {} liked videos", liked_videos.len());

    Ok(replay_likes(target, &liked_videos).await)
}
