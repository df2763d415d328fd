//! Inventory service — the operations a front end exposes.
//!
//! Inventory ties the catalog store, the movement log and the key
//! allocator together behind session-checked calls. Every call starts from
//! a fresh load of the catalog file, so the in-memory [`Catalog`] lives for
//! one operation only:
//!
//! **Add**: load, validate, append one row
//! **Update locations**: load, validate, rewrite catalog, append movement
//! **Delete**: load, check key, rewrite catalog without it
//!
//! A movement row is only written after the catalog rewrite succeeded, so
//! the audit trail never records a move that did not happen. If the
//! movement append then fails, the catalog is rewritten with the previous
//! locations, so a persisted move always has exactly one movement row.
//!
//! Keys passed to lookups are trimmed the same way `add_product` trims the
//! key it stores.

use chrono::{Local, NaiveDateTime};
use tracing::{error, info};

use crate::auth::{Action, Session};
use crate::catalog::{Catalog, CatalogStore};
use crate::config::Config;
use crate::error::{ShelfError, ShelfResult, ValidationError};
use crate::keys::KeyAllocator;
use crate::movement::{Movement, MovementLog};
use crate::record::{parse_locations, parse_machines, Product};

/// Raw add-product form, list fields still as typed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewProduct {
    pub key: String,
    pub name: String,
    pub internal_code: String,
    pub color: String,
    pub manufacturer: String,
    pub container_type: String,
    /// e.g. `"1,2,3,4"`
    pub machines: String,
    /// e.g. `"Stanza 1,Stanza 2"`
    pub locations: String,
}

impl NewProduct {
    /// Form fields in display order, for the required-field check.
    fn fields(&self) -> [(&'static str, &str); 8] {
        [
            ("name", self.name.as_str()),
            ("internal_code", self.internal_code.as_str()),
            ("color", self.color.as_str()),
            ("manufacturer", self.manufacturer.as_str()),
            ("container_type", self.container_type.as_str()),
            ("machines", self.machines.as_str()),
            ("locations", self.locations.as_str()),
            ("key", self.key.as_str()),
        ]
    }
}

/// Catalog operations for an authenticated session.
pub struct Inventory {
    config: Config,
    catalog: CatalogStore,
    movements: MovementLog,
    keys: KeyAllocator,
}

impl Inventory {
    /// Validate `config` and create the data directory if needed.
    pub fn open(config: Config) -> ShelfResult<Self> {
        config.validate().map_err(ShelfError::InvalidConfig)?;

        std::fs::create_dir_all(&config.data_dir)
            .map_err(|e| ShelfError::io(&config.data_dir, "failed to create data directory", e))?;

        info!(
            target: "shelfstore::inventory",
            catalog = %config.catalog_path().display(),
            movements = %config.movements_path().display(),
            "inventory opened"
        );

        Ok(Self {
            catalog: CatalogStore::from_config(&config),
            movements: MovementLog::from_config(&config),
            keys: KeyAllocator::from_config(&config),
            config,
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn catalog_store(&self) -> &CatalogStore {
        &self.catalog
    }

    pub fn movement_log(&self) -> &MovementLog {
        &self.movements
    }

    /// Fresh in-memory copy of the catalog.
    pub fn load(&self) -> ShelfResult<Catalog> {
        Ok(Catalog::from_products(self.catalog.load_all()?))
    }

    /// Next free key, as shown pre-filled on the add form.
    pub fn suggest_key(&self, session: &Session) -> ShelfResult<String> {
        session.require(Action::AddProduct)?;
        let catalog = self.load()?;
        Ok(self.keys.suggest(catalog.keys()))
    }

    /// Validate the form and append the product.
    ///
    /// Checks, in order: every field filled, key not taken, color in the
    /// palette, at least one location, at least one machine. Scalar fields
    /// are stored trimmed.
    pub fn add_product(&self, session: &Session, form: &NewProduct) -> ShelfResult<Product> {
        session.require(Action::AddProduct)?;

        let missing = form
            .fields()
            .into_iter()
            .find(|(_, value)| value.trim().is_empty());
        if let Some((field, _)) = missing {
            return Err(ValidationError::MissingField(field).into());
        }

        let catalog = self.load()?;
        let key = form.key.trim();
        if catalog.contains_key(key) {
            return Err(ValidationError::DuplicateKey(key.to_string()).into());
        }

        let color = form.color.trim();
        if !self.config.allows_color(color) {
            return Err(ValidationError::UnknownColor(color.to_string()).into());
        }

        let locations = parse_locations(&form.locations);
        if locations.is_empty() {
            return Err(ValidationError::NoLocations.into());
        }
        let machines = parse_machines(&form.machines);
        if machines.is_empty() {
            return Err(ValidationError::NoMachines.into());
        }

        let product = Product {
            key: key.to_string(),
            name: form.name.trim().to_string(),
            internal_code: form.internal_code.trim().to_string(),
            color: color.to_string(),
            manufacturer: form.manufacturer.trim().to_string(),
            container_type: form.container_type.trim().to_string(),
            machines,
            locations,
        };
        self.catalog.append_one(&product)?;

        info!(
            target: "shelfstore::inventory",
            user = session.user_id(),
            key = %product.key,
            "product added"
        );
        Ok(product)
    }

    /// Every product in catalog order, one per key.
    pub fn list(&self, session: &Session) -> ShelfResult<Vec<Product>> {
        session.require(Action::ListProducts)?;
        Ok(self.load()?.products().to_vec())
    }

    /// The last `recent_limit` products in catalog order.
    pub fn recent(&self, session: &Session) -> ShelfResult<Vec<Product>> {
        session.require(Action::ListProducts)?;
        let catalog = self.load()?;
        Ok(catalog.recent(self.config.recent_limit).to_vec())
    }

    /// One product by key.
    pub fn get(&self, session: &Session, key: &str) -> ShelfResult<Option<Product>> {
        session.require(Action::ListProducts)?;
        Ok(self.load()?.get(key.trim()).cloned())
    }

    /// Replace a product's locations and audit the move, stamped now.
    pub fn update_locations(
        &self,
        session: &Session,
        key: &str,
        locations: &str,
    ) -> ShelfResult<Movement> {
        self.update_locations_at(session, key, locations, Local::now().naive_local())
    }

    /// Replace a product's locations and audit the move, stamped `now`.
    pub fn update_locations_at(
        &self,
        session: &Session,
        key: &str,
        locations: &str,
        now: NaiveDateTime,
    ) -> ShelfResult<Movement> {
        session.require(Action::UpdateLocations)?;

        let key = key.trim();
        let new_locations = parse_locations(locations);
        if new_locations.is_empty() {
            return Err(ValidationError::NoLocations.into());
        }

        let mut catalog = self.load()?;
        let product = catalog
            .get_mut(key)
            .ok_or_else(|| ValidationError::UnknownKey(key.to_string()))?;
        let previous = std::mem::replace(&mut product.locations, new_locations.clone());

        self.catalog.replace_all(catalog.products())?;
        let movement = match self.movements.record_move(key, &previous, &new_locations, now) {
            Ok(movement) => movement,
            Err(e) => {
                self.restore_locations(&mut catalog, key, previous);
                return Err(e);
            }
        };

        info!(
            target: "shelfstore::inventory",
            user = session.user_id(),
            key,
            "locations updated"
        );
        Ok(movement)
    }

    /// Undo a rewritten move whose movement row could not be appended.
    fn restore_locations(&self, catalog: &mut Catalog, key: &str, previous: Vec<String>) {
        if let Some(product) = catalog.get_mut(key) {
            product.locations = previous;
        }
        match self.catalog.replace_all(catalog.products()) {
            Ok(()) => info!(
                target: "shelfstore::inventory",
                key,
                "movement append failed, previous locations restored"
            ),
            Err(e) => error!(
                target: "shelfstore::inventory",
                key,
                error = %e,
                "movement append failed and previous locations could not be restored"
            ),
        }
    }

    /// Delete a product. Fails with `UnknownKey` if it is not in the
    /// catalog; the file is left untouched in that case.
    pub fn delete_product(&self, session: &Session, key: &str) -> ShelfResult<()> {
        session.require(Action::DeleteProduct)?;

        let key = key.trim();
        let catalog = self.load()?;
        if !catalog.contains_key(key) {
            return Err(ValidationError::UnknownKey(key.to_string()).into());
        }
        self.catalog.delete_by_key(key)?;

        info!(target: "shelfstore::inventory", user = session.user_id(), key, "product deleted");
        Ok(())
    }

    /// Audit trail, optionally narrowed to one key.
    pub fn movements(&self, session: &Session, key: Option<&str>) -> ShelfResult<Vec<Movement>> {
        session.require(Action::ListProducts)?;
        match key {
            Some(key) => self.movements.history(key.trim()),
            None => self.movements.read_all(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::CredentialTable;
    use chrono::NaiveDate;
    use std::fs;
    use tempfile::TempDir;

    fn test_inventory() -> (Inventory, Session, Session, TempDir) {
        let dir = TempDir::new().unwrap();
        let inventory = Inventory::open(Config::scratch(dir.path())).unwrap();
        let table = CredentialTable::builtin();
        let admin = table.login("1001", "OB4729").unwrap();
        let viewer = table.login("1002", "OB8391").unwrap();
        (inventory, admin, viewer, dir)
    }

    fn form(key: &str) -> NewProduct {
        NewProduct {
            key: key.into(),
            name: "Crema viso".into(),
            internal_code: "CV-01".into(),
            color: "Neutro".into(),
            manufacturer: "Acme".into(),
            container_type: "Vasetto 50ml".into(),
            machines: "1, 2,x,3".into(),
            locations: "Room A, ,Room B".into(),
        }
    }

    fn noon() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 5, 2).unwrap().and_hms_opt(12, 0, 0).unwrap()
    }

    #[test]
    fn test_open_rejects_bad_config() {
        let dir = TempDir::new().unwrap();
        let mut config = Config::scratch(dir.path());
        config.colors.clear();
        assert!(matches!(Inventory::open(config), Err(ShelfError::InvalidConfig(_))));
    }

    #[test]
    fn test_open_creates_data_dir() {
        let dir = TempDir::new().unwrap();
        let nested = dir.path().join("a").join("b");
        Inventory::open(Config::scratch(&nested)).unwrap();
        assert!(nested.is_dir());
    }

    #[test]
    fn test_add_parses_lists() {
        let (inv, _admin, viewer, _dir) = test_inventory();
        let product = inv.add_product(&viewer, &form("OBEN001")).unwrap();
        assert_eq!(product.machines, vec![1, 2, 3]);
        assert_eq!(product.locations, vec!["Room A", "Room B"]);
        assert_eq!(inv.list(&viewer).unwrap(), vec![product]);
    }

    #[test]
    fn test_add_missing_field() {
        let (inv, admin, _viewer, _dir) = test_inventory();
        let mut f = form("OBEN001");
        f.manufacturer = "   ".into();
        match inv.add_product(&admin, &f) {
            Err(ShelfError::Validation(ValidationError::MissingField(field))) => {
                assert_eq!(field, "manufacturer")
            }
            other => panic!("Expected MissingField, got {:?}", other),
        }
        assert!(!inv.catalog_store().path().exists());
    }

    #[test]
    fn test_add_duplicate_key() {
        let (inv, admin, _viewer, _dir) = test_inventory();
        inv.add_product(&admin, &form("OBEN001")).unwrap();
        assert!(matches!(
            inv.add_product(&admin, &form("OBEN001")),
            Err(ShelfError::Validation(ValidationError::DuplicateKey(k))) if k == "OBEN001"
        ));
        assert_eq!(inv.list(&admin).unwrap().len(), 1);
    }

    #[test]
    fn test_add_unknown_color() {
        let (inv, admin, _viewer, _dir) = test_inventory();
        let mut f = form("OBEN001");
        f.color = "Rosso".into();
        assert!(matches!(
            inv.add_product(&admin, &f),
            Err(ShelfError::Validation(ValidationError::UnknownColor(_)))
        ));
    }

    #[test]
    fn test_add_needs_machine_and_location() {
        let (inv, admin, _viewer, _dir) = test_inventory();

        let mut f = form("OBEN001");
        f.locations = " , ,".into();
        assert!(matches!(
            inv.add_product(&admin, &f),
            Err(ShelfError::Validation(ValidationError::NoLocations))
        ));

        let mut f = form("OBEN001");
        f.machines = "x, y".into();
        assert!(matches!(
            inv.add_product(&admin, &f),
            Err(ShelfError::Validation(ValidationError::NoMachines))
        ));
    }

    #[test]
    fn test_suggest_key_follows_catalog() {
        let (inv, admin, _viewer, _dir) = test_inventory();
        assert_eq!(inv.suggest_key(&admin).unwrap(), "OBEN001");
        inv.add_product(&admin, &form("OBEN001")).unwrap();
        inv.add_product(&admin, &form("OBEN007")).unwrap();
        inv.add_product(&admin, &form("CUSTOM")).unwrap();
        assert_eq!(inv.suggest_key(&admin).unwrap(), "OBEN008");
    }

    #[test]
    fn test_update_locations_records_movement() {
        let (inv, admin, _viewer, _dir) = test_inventory();
        inv.add_product(&admin, &form("OBEN001")).unwrap();
        inv.add_product(&admin, &form("OBEN002")).unwrap();

        let movement = inv.update_locations_at(&admin, "OBEN001", "Room C", noon()).unwrap();
        assert_eq!(movement.previous_locations, "Room A,Room B");
        assert_eq!(movement.new_locations, "Room C");
        assert_eq!(movement.timestamp, "2026-05-02 12:00:00");

        let catalog = inv.load().unwrap();
        assert_eq!(catalog.get("OBEN001").unwrap().locations, vec!["Room C"]);
        assert_eq!(catalog.get("OBEN002").unwrap().locations, vec!["Room A", "Room B"]);
        assert_eq!(catalog.keys().collect::<Vec<_>>(), vec!["OBEN001", "OBEN002"]);

        assert_eq!(inv.movements(&admin, None).unwrap(), vec![movement]);
    }

    #[test]
    fn test_update_rejections_leave_files_alone() {
        let (inv, admin, viewer, _dir) = test_inventory();
        inv.add_product(&admin, &form("OBEN001")).unwrap();

        assert!(matches!(
            inv.update_locations_at(&admin, "OBEN001", " , ", noon()),
            Err(ShelfError::Validation(ValidationError::NoLocations))
        ));
        assert!(matches!(
            inv.update_locations_at(&admin, "OBEN404", "Room C", noon()),
            Err(ShelfError::Validation(ValidationError::UnknownKey(_)))
        ));
        assert!(matches!(
            inv.update_locations_at(&viewer, "OBEN001", "Room C", noon()),
            Err(ShelfError::Forbidden { .. })
        ));

        assert!(inv.movements(&admin, None).unwrap().is_empty());
        let product = inv.get(&admin, "OBEN001").unwrap().unwrap();
        assert_eq!(product.locations, vec!["Room A", "Room B"]);
    }

    #[test]
    fn test_update_restores_catalog_when_movement_append_fails() {
        let (inv, admin, _viewer, _dir) = test_inventory();
        inv.add_product(&admin, &form("OBEN001")).unwrap();
        fs::create_dir(inv.config().movements_path()).unwrap();

        assert!(matches!(
            inv.update_locations_at(&admin, "OBEN001", "Room C", noon()),
            Err(ShelfError::Io { .. })
        ));
        let product = inv.get(&admin, "OBEN001").unwrap().unwrap();
        assert_eq!(product.locations, vec!["Room A", "Room B"]);

        fs::remove_dir(inv.config().movements_path()).unwrap();
        let movement = inv.update_locations_at(&admin, "OBEN001", "Room C", noon()).unwrap();
        assert_eq!(movement.previous_locations, "Room A,Room B");
        assert_eq!(inv.movements(&admin, None).unwrap(), vec![movement]);
    }

    #[test]
    fn test_update_failed_rewrite_leaves_files_alone() {
        let (inv, admin, _viewer, _dir) = test_inventory();
        inv.add_product(&admin, &form("OBEN001")).unwrap();
        let before = fs::read(inv.config().catalog_path()).unwrap();

        let mut tmp = inv.config().catalog_path().into_os_string();
        tmp.push(".tmp");
        fs::create_dir(&tmp).unwrap();

        assert!(matches!(
            inv.update_locations_at(&admin, "OBEN001", "Room C", noon()),
            Err(ShelfError::Io { .. })
        ));
        assert_eq!(fs::read(inv.config().catalog_path()).unwrap(), before);
        assert!(inv.movements(&admin, None).unwrap().is_empty());
    }

    #[test]
    fn test_lookups_trim_key() {
        let (inv, admin, _viewer, _dir) = test_inventory();
        let stored = inv.add_product(&admin, &form(" OBEN001 ")).unwrap();
        assert_eq!(stored.key, "OBEN001");

        assert_eq!(inv.get(&admin, " OBEN001 ").unwrap(), Some(stored));
        let movement = inv.update_locations_at(&admin, " OBEN001 ", "Room C", noon()).unwrap();
        assert_eq!(movement.key, "OBEN001");
        assert_eq!(inv.movements(&admin, Some(" OBEN001")).unwrap().len(), 1);

        inv.delete_product(&admin, "OBEN001 ").unwrap();
        assert!(inv.list(&admin).unwrap().is_empty());
    }

    #[test]
    fn test_list_agrees_with_lookups_on_duplicate_keys() {
        let (inv, admin, _viewer, _dir) = test_inventory();
        fs::write(
            inv.config().catalog_path(),
            "key,name,internal_code,color,manufacturer,container_type,machines,locations\n\
             OBEN001,A,a,Neutro,X,V,1,old\n\
             OBEN002,B,b,Bianco,Y,W,2,Room B\n\
             OBEN001,A,a,Neutro,X,V,1,new\n",
        )
        .unwrap();

        let listed = inv.list(&admin).unwrap();
        let keys: Vec<&str> = listed.iter().map(|p| p.key.as_str()).collect();
        assert_eq!(keys, vec!["OBEN001", "OBEN002"]);
        assert_eq!(listed[0].locations, vec!["new"]);
        assert_eq!(Some(listed[0].clone()), inv.get(&admin, "OBEN001").unwrap());
    }

    #[test]
    fn test_delete_product() {
        let (inv, admin, viewer, _dir) = test_inventory();
        inv.add_product(&admin, &form("OBEN001")).unwrap();
        inv.add_product(&admin, &form("OBEN002")).unwrap();

        assert!(matches!(
            inv.delete_product(&viewer, "OBEN001"),
            Err(ShelfError::Forbidden { .. })
        ));
        inv.delete_product(&admin, "OBEN001").unwrap();

        let keys: Vec<String> = inv.list(&admin).unwrap().into_iter().map(|p| p.key).collect();
        assert_eq!(keys, vec!["OBEN002"]);

        assert!(matches!(
            inv.delete_product(&admin, "OBEN001"),
            Err(ShelfError::Validation(ValidationError::UnknownKey(_)))
        ));
    }

    #[test]
    fn test_recent_uses_limit() {
        let (inv, admin, _viewer, _dir) = test_inventory();
        for i in 1..=7 {
            inv.add_product(&admin, &form(&format!("OBEN{:03}", i))).unwrap();
        }
        let recent: Vec<String> = inv.recent(&admin).unwrap().into_iter().map(|p| p.key).collect();
        assert_eq!(recent, vec!["OBEN003", "OBEN004", "OBEN005", "OBEN006", "OBEN007"]);
    }
}
