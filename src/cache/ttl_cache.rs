use dashmap::DashMap;
use std::{
    hash::Hash,
    sync::Arc,
    time::{Duration, Instant},
};
use tracing::debug;

/// TTL por defecto: 5 minutos
pub const DEFAULT_TTL: Duration = Duration::from_secs(5 * 60);

/// Entrada de caché con instante de expiración
#[derive(Debug, Clone)]
struct CacheEntry<V> {
    value: V,
    expires_at: Instant,
}

impl<V> CacheEntry<V> {
    fn new(value: V, ttl: Duration) -> Self {
        Self {
            value,
            expires_at: Instant::now() + ttl,
        }
    }

    fn is_expired(&self) -> bool {
        Instant::now() >= self.expires_at
    }
}

/// Caché clave/valor con expiración perezosa.
///
/// No hay tarea de limpieza en segundo plano: la expiración sólo se
/// comprueba al leer. Clonar el caché comparte el mismo almacenamiento.
#[derive(Debug)]
pub struct TtlCache<K: Clone + Eq + Hash, V> {
    data: Arc<DashMap<K, CacheEntry<V>>>,
    ttl: Duration,
}

impl<K, V> TtlCache<K, V>
where
    K: Clone + Eq + Hash + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    pub fn new(ttl: Duration) -> Self {
        Self {
            data: Arc::new(DashMap::new()),
            ttl,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Guarda `value` con el TTL configurado. Devuelve el valor anterior si seguía vigente.
    pub fn set(&self, key: K, value: V) -> Option<V> {
        self.set_with_ttl(key, value, self.ttl)
    }

    pub fn set_with_ttl(&self, key: K, value: V, ttl: Duration) -> Option<V> {
        let entry = CacheEntry::new(value, ttl);
        self.data
            .insert(key, entry)
            .filter(|old| !old.is_expired())
            .map(|old| old.value)
    }

    pub fn get(&self, key: &K) -> Option<V> {
        match self.data.get(key) {
            Some(entry) if !entry.is_expired() => return Some(entry.value.clone()),
            Some(_) => {}
            None => return None,
        }

        // Sólo se borra si sigue expirada: una escritura concurrente gana
        if self.data.remove_if(key, |_, entry| entry.is_expired()).is_some() {
            debug!("⏰ Entrada expirada removida del caché");
        }
        None
    }

    #[allow(dead_code)]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    #[allow(dead_code)]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

impl<K, V> Clone for TtlCache<K, V>
where
    K: Clone + Eq + Hash,
    V: Clone,
{
    fn clone(&self) -> Self {
        Self {
            data: self.data.clone(),
            ttl: self.ttl,
        }
    }
}

impl<K, V> Default for TtlCache<K, V>
where
    K: Clone + Eq + Hash + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new(DEFAULT_TTL)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread::sleep;

    #[test]
    fn test_set_then_get_returns_value() {
        let cache: TtlCache<String, String> = TtlCache::default();
        assert_eq!(cache.ttl(), DEFAULT_TTL);

        cache.set("alice".to_string(), "roast".to_string());
        assert_eq!(cache.get(&"alice".to_string()), Some("roast".to_string()));
    }

    #[test]
    fn test_missing_key_is_absent() {
        let cache: TtlCache<String, u32> = TtlCache::new(Duration::from_secs(60));
        assert_eq!(cache.get(&"nobody".to_string()), None);
        assert!(cache.is_empty());
    }

    #[test]
    fn test_expired_entry_is_purged_on_read() {
        let cache: TtlCache<String, String> = TtlCache::new(Duration::from_millis(20));
        cache.set("alice".to_string(), "old".to_string());
        sleep(Duration::from_millis(40));

        assert_eq!(cache.get(&"alice".to_string()), None);
        assert_eq!(cache.len(), 0);

        // Sin residuos del valor anterior
        assert_eq!(cache.set("alice".to_string(), "new".to_string()), None);
        assert_eq!(cache.get(&"alice".to_string()), Some("new".to_string()));
    }

    #[test]
    fn test_set_with_ttl_overrides_default() {
        let cache: TtlCache<&'static str, u32> = TtlCache::new(Duration::from_secs(60));
        cache.set_with_ttl("short", 1, Duration::from_millis(10));
        cache.set("long", 2);
        sleep(Duration::from_millis(30));

        assert_eq!(cache.get(&"short"), None);
        assert_eq!(cache.get(&"long"), Some(2));
    }

    #[test]
    fn test_overwrite_returns_previous_live_value() {
        let cache: TtlCache<&'static str, u32> = TtlCache::new(Duration::from_secs(60));
        assert_eq!(cache.set("k", 1), None);
        assert_eq!(cache.set("k", 2), Some(1));
        assert_eq!(cache.get(&"k"), Some(2));
    }

    #[test]
    fn test_clones_share_storage() {
        let cache: TtlCache<&'static str, u32> = TtlCache::new(Duration::from_secs(60));
        let other = cache.clone();
        other.set("k", 7);
        assert_eq!(cache.get(&"k"), Some(7));
    }
}
