/// A macro to simplify read-through caching of provider responses.
///
/// Checks the optional cache for the key. On a hit the cached value is
/// returned; on a miss (or when the cache is unavailable) the block is awaited,
/// its value queued for a background cache write, and returned.
///
/// # Arguments
/// * `$cache`: an `Option<Cache>`; `None` disables caching.
/// * `$key`: the `CacheKey` to read and write.
/// * `$ttl`: time-to-live for the cached value in seconds.
/// * `$block`: future computing the value on a miss. Errors propagate with `?`.
///
/// # Example
/// ```rust,ignore
/// cached!(self.cache, CacheKey::Genres(language.to_string()), GENRE_CACHE_TTL, async move {
///     self.get_json("/genre/movie/list", &[("language", language)]).await
/// })
/// ```
#[macro_export]
macro_rules! cached {
    ($cache:expr, $key:expr, $ttl:expr, $block:expr) => {{
        let key = $key;
        let cache: Option<&$crate::db::Cache> = $cache.as_ref();
        let hit = match cache {
            Some(cache) => cache.lookup(&key).await,
            None => None,
        };
        match hit {
            Some(cached) => Ok(cached),
            None => {
                let value = $block.await?;
                if let Some(cache) = cache {
                    cache.set_in_background(&key, &value, $ttl);
                }
                Ok(value)
            }
        }
    }};
}
