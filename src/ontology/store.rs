//! YAML-backed ontology store
//!
//! Every mutation takes the store lock, reads the whole file, checks its
//! precondition, applies the change and writes the whole file back through
//! a temp file + rename. A failed precondition leaves the file untouched.

use chrono::Utc;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tempfile::NamedTempFile;
use tracing::{debug, info};

use crate::errors::{BuddyError, Result};
use crate::ontology::facts::{Fact, OwnedVehicle, ViolationCheck};
use crate::ontology::types::{LicenseStatus, NewVehicle, Ontology, Owner, Vehicle};

/// Default note for owners added without one
pub const DEFAULT_OWNER_NOTE: &str = "new owner added";

/// Whole-file YAML document guarded by an in-process lock
#[derive(Debug)]
pub(crate) struct YamlFile {
    path: PathBuf,
    lock: Mutex<()>,
}

impl YamlFile {
    pub(crate) fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub(crate) fn path(&self) -> &Path {
        &self.path
    }

    /// Read the document; a missing or blank file reads as `T::default()`
    pub(crate) fn read<T: DeserializeOwned + Default>(&self) -> Result<T> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "store file missing, using empty document");
                return Ok(T::default());
            }
            Err(e) => return Err(e.into()),
        };

        if raw.trim().is_empty() {
            return Ok(T::default());
        }
        Ok(serde_yaml::from_str(&raw)?)
    }

    /// Locked read-modify-write; nothing is written when `apply` fails
    pub(crate) fn update<T, R, F>(&self, apply: F) -> Result<R>
    where
        T: DeserializeOwned + Serialize + Default,
        F: FnOnce(&mut T) -> Result<R>,
    {
        let _guard = self.lock.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        let mut document: T = self.read()?;
        let outcome = apply(&mut document)?;
        self.write(&document)?;
        Ok(outcome)
    }

    /// Replace the file atomically
    pub(crate) fn write<T: Serialize>(&self, document: &T) -> Result<()> {
        let yaml = serde_yaml::to_string(document)?;

        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        fs::create_dir_all(dir)?;

        let mut tmp = NamedTempFile::new_in(dir)?;
        tmp.write_all(yaml.as_bytes())?;
        tmp.as_file().sync_all()?;
        tmp.persist(&self.path).map_err(|e| BuddyError::IoError(e.error))?;
        Ok(())
    }
}

/// Vehicle and owner facts persisted as one YAML file
#[derive(Debug)]
pub struct OntologyStore {
    file: YamlFile,
}

impl OntologyStore {
    /// Open store at `path`; the file is created on first mutation
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            file: YamlFile::new(path),
        }
    }

    pub fn path(&self) -> &Path {
        self.file.path()
    }

    /// Current snapshot
    pub fn load(&self) -> Result<Ontology> {
        self.file.read()
    }

    /// Register a vehicle; an existing plate is `AlreadyExists`
    pub fn add_vehicle(&self, vehicle: NewVehicle) -> Result<Vehicle> {
        let plate = vehicle.plate.trim().to_string();
        if plate.is_empty() {
            return Err(BuddyError::ParseError("plate must not be empty".to_string()));
        }

        self.file.update(|ontology: &mut Ontology| {
            if ontology.vehicles.contains_key(&plate) {
                return Err(BuddyError::AlreadyExists(format!("vehicle {}", plate)));
            }
            let (_, record) = NewVehicle { plate: plate.clone(), ..vehicle }.into_record();
            ontology.vehicles.insert(plate.clone(), record.clone());
            info!(%plate, status = %record.license_status, "vehicle added");
            Ok(record)
        })
    }

    /// Set a license status; returns the previous one. Missing plate is `NotFound`
    pub fn update_license(&self, plate: &str, status: LicenseStatus) -> Result<LicenseStatus> {
        let plate = plate.trim();
        self.file.update(|ontology: &mut Ontology| {
            let vehicle = ontology
                .vehicles
                .get_mut(plate)
                .ok_or_else(|| BuddyError::NotFound(format!("vehicle {}", plate)))?;
            let previous = std::mem::replace(&mut vehicle.license_status, status);
            info!(%plate, from = %previous, to = %status, "license updated");
            Ok(previous)
        })
    }

    /// Register an owner; an existing name is `AlreadyExists`
    pub fn add_owner(&self, name: &str, note: Option<&str>) -> Result<Owner> {
        let name = name.trim();
        if name.is_empty() {
            return Err(BuddyError::ParseError("owner name must not be empty".to_string()));
        }

        self.file.update(|ontology: &mut Ontology| {
            if ontology.owners.contains_key(name) {
                return Err(BuddyError::AlreadyExists(format!("owner {}", name)));
            }
            let owner = Owner {
                note: note.unwrap_or(DEFAULT_OWNER_NOTE).to_string(),
                added_at: Some(Utc::now()),
            };
            ontology.owners.insert(name.to_string(), owner.clone());
            info!(owner = name, "owner added");
            Ok(owner)
        })
    }

    pub fn vehicle_facts(&self, plate: &str) -> Result<Option<Vec<Fact>>> {
        Ok(self.load()?.vehicle_facts(plate.trim()))
    }

    pub fn check_violation(&self, plate: &str) -> Result<ViolationCheck> {
        Ok(self.load()?.check_violation(plate.trim()))
    }

    pub fn owner_vehicles(&self, owner: &str) -> Result<Vec<OwnedVehicle>> {
        Ok(self.load()?.owner_vehicles(owner))
    }

    pub fn is_high_risk(&self, owner: &str) -> Result<bool> {
        Ok(self.load()?.is_high_risk(owner))
    }
}
