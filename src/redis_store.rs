use crate::error::{corrupt, InventoryResult};
use crate::model::{ItemDocument, ItemName, Revision};
use crate::store::ItemStore;
use crate::{redis_error, serde_error};
use redis::{Client, Commands, Connection};

const DEFAULT_NAMESPACE: &str = "inventory";

/// Redis-backed item store that mirrors the in-memory semantics.
///
/// Each item is a hash at `{namespace}:item:{name}` with a JSON `doc` field and an
/// integer `rev` field. The set `{namespace}:items` indexes every stored name so the
/// full collection can be listed without a keyspace scan. Revisions are drawn from the
/// counter at `{namespace}:rev`, which outlives any single document.
pub struct RedisItemStore {
    client: Client,
    namespace: String,
}

impl RedisItemStore {
    /// Creates a store using a Redis URL and the default namespace prefix.
    pub fn from_url(url: impl AsRef<str>) -> InventoryResult<Self> {
        Self::from_url_with_namespace(url, DEFAULT_NAMESPACE)
    }

    /// Creates a store using a Redis URL and a custom namespace prefix.
    pub fn from_url_with_namespace(
        url: impl AsRef<str>,
        namespace: impl Into<String>,
    ) -> InventoryResult<Self> {
        let client = Client::open(url.as_ref()).map_err(redis_error)?;
        Ok(Self::from_client_with_namespace(client, namespace))
    }

    pub(crate) fn from_client_with_namespace(client: Client, namespace: impl Into<String>) -> Self {
        Self {
            client,
            namespace: namespace.into(),
        }
    }

    fn conn(&self) -> InventoryResult<Connection> {
        self.client.get_connection().map_err(redis_error)
    }

    fn item_key(&self, name: &ItemName) -> String {
        format!("{}:item:{}", self.namespace, name.as_str())
    }

    fn index_key(&self) -> String {
        format!("{}:items", self.namespace)
    }

    fn clock_key(&self) -> String {
        format!("{}:rev", self.namespace)
    }

    fn serialize(doc: &ItemDocument) -> InventoryResult<String> {
        serde_json::to_string(doc).map_err(serde_error)
    }

    fn deserialize(name: &ItemName, payload: &str) -> InventoryResult<ItemDocument> {
        serde_json::from_str(payload).map_err(|err| corrupt(name.as_str(), err))
    }

    fn read(conn: &mut Connection, key: &str) -> InventoryResult<Option<(String, Revision)>> {
        let (payload, rev): (Option<String>, Option<u64>) = redis::cmd("HMGET")
            .arg(key)
            .arg("doc")
            .arg("rev")
            .query(conn)
            .map_err(redis_error)?;
        Ok(payload.map(|payload| (payload, Revision(rev.unwrap_or(0)))))
    }
}

impl ItemStore for RedisItemStore {
    fn list(&self) -> InventoryResult<Vec<(ItemName, ItemDocument)>> {
        let mut conn = self.conn()?;
        let index = self.index_key();
        let names: Vec<String> = conn.smembers(&index).map_err(redis_error)?;
        let mut items = Vec::with_capacity(names.len());
        for raw in names {
            let name = ItemName::new(raw);
            match Self::read(&mut conn, &self.item_key(&name))? {
                Some((payload, _)) => {
                    let doc = Self::deserialize(&name, &payload)?;
                    items.push((name, doc));
                }
                None => {
                    // index entry outlived its document
                    let _: () = conn.srem(&index, name.as_str()).map_err(redis_error)?;
                }
            }
        }
        Ok(items)
    }

    fn get(&self, name: &ItemName) -> InventoryResult<Option<(ItemDocument, Revision)>> {
        let mut conn = self.conn()?;
        match Self::read(&mut conn, &self.item_key(name))? {
            Some((payload, rev)) => Ok(Some((Self::deserialize(name, &payload)?, rev))),
            None => Ok(None),
        }
    }

    fn put(&self, name: &ItemName, doc: ItemDocument) -> InventoryResult<Revision> {
        doc.ensure_storable()?;
        let payload = Self::serialize(&doc)?;
        let key = self.item_key(name);
        let mut conn = self.conn()?;
        let rev: u64 = conn.incr(self.clock_key(), 1).map_err(redis_error)?;
        redis::pipe()
            .atomic()
            .hset(&key, "doc", payload)
            .ignore()
            .hset(&key, "rev", rev)
            .ignore()
            .sadd(self.index_key(), name.as_str())
            .ignore()
            .query::<()>(&mut conn)
            .map_err(redis_error)?;
        Ok(Revision(rev))
    }

    fn put_cas(
        &self,
        name: &ItemName,
        doc: ItemDocument,
        expected: Revision,
    ) -> InventoryResult<Result<Revision, Revision>> {
        doc.ensure_storable()?;
        let payload = Self::serialize(&doc)?;
        let key = self.item_key(name);
        let index = self.index_key();
        let clock = self.clock_key();
        let mut conn = self.conn()?;
        redis::transaction(&mut conn, &[key.as_str()], |con, pipe| {
            let current: Option<u64> = con.hget(&key, "rev")?;
            let current = Revision(current.unwrap_or(0));
            if current != expected {
                return Ok(Some(Err(current)));
            }
            let next = Revision(con.incr(&clock, 1)?);
            pipe.hset(&key, "doc", &payload)
                .ignore()
                .hset(&key, "rev", next.value())
                .ignore()
                .sadd(&index, name.as_str())
                .ignore()
                .query::<Option<()>>(con)
                .map(|done| done.map(|()| Ok(next)))
        })
        .map_err(redis_error)
    }

    fn delete(&self, name: &ItemName) -> InventoryResult<bool> {
        let mut conn = self.conn()?;
        let (removed,): (u64,) = redis::pipe()
            .atomic()
            .del(self.item_key(name))
            .srem(self.index_key(), name.as_str())
            .ignore()
            .query(&mut conn)
            .map_err(redis_error)?;
        Ok(removed > 0)
    }

    fn delete_cas(&self, name: &ItemName, expected: Revision) -> InventoryResult<Result<(), Revision>> {
        let key = self.item_key(name);
        let index = self.index_key();
        let mut conn = self.conn()?;
        redis::transaction(&mut conn, &[key.as_str()], |con, pipe| {
            let current: Option<u64> = con.hget(&key, "rev")?;
            let current = Revision(current.unwrap_or(0));
            if current == Revision::none() || current != expected {
                return Ok(Some(Err(current)));
            }
            pipe.del(&key)
                .ignore()
                .srem(&index, name.as_str())
                .ignore()
                .query::<Option<()>>(con)
                .map(|done| done.map(|()| Ok(())))
        })
        .map_err(redis_error)
    }
}
