//! # Actor Context
//!
//! The authenticated caller identity supplied by the (external)
//! authentication gate on every core call. The core never verifies
//! credentials; it only evaluates the roles carried here against step
//! requirements.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Employee role capabilities, one per workflow station.
///
/// The tokens are the short role codes used throughout the deployed
/// system (assignment letters, seed data, exports), so `Display`/`FromStr`
/// keep their exact spelling, including the mixed-case `OSPBy`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EmployeeRole {
    /// Verifikator
    Ver,
    /// Petugas Pembuat Rincian Biaya PD
    Pprbpd,
    /// Operator Komitmen
    Ok,
    /// Operator SPM
    Ospm,
    /// Operator Pembayaran
    Op,
    /// Operator SPBy
    Ospby,
    /// Bendahara Pengeluaran
    Bp,
    /// Pejabat Pembuat Komitmen
    Ppk,
    /// Pelaksana Perjalanan Dinas - the designated executor who signs
    Ppd,
    /// Admin Digit Kemenkeu
    Adk,
    /// Kepala Sub Bagian Umum
    Ksbu,
    /// Petugas Arsip Berkas PD
    Pabpd,
}

impl EmployeeRole {
    /// The role reserved for the specially-gated signing step. When a
    /// ticket names assigned executors, only they may process that step.
    pub fn is_designated_executor(&self) -> bool {
        matches!(self, Self::Ppd)
    }
}

impl fmt::Display for EmployeeRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let code = match self {
            Self::Ver => "VER",
            Self::Pprbpd => "PPRBPD",
            Self::Ok => "OK",
            Self::Ospm => "OSPM",
            Self::Op => "OP",
            Self::Ospby => "OSPBy",
            Self::Bp => "BP",
            Self::Ppk => "PPK",
            Self::Ppd => "PPD",
            Self::Adk => "ADK",
            Self::Ksbu => "KSBU",
            Self::Pabpd => "PABPD",
        };
        write!(f, "{code}")
    }
}

impl std::str::FromStr for EmployeeRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "VER" => Ok(Self::Ver),
            "PPRBPD" => Ok(Self::Pprbpd),
            "OK" => Ok(Self::Ok),
            "OSPM" => Ok(Self::Ospm),
            "OP" => Ok(Self::Op),
            "OSPBy" => Ok(Self::Ospby),
            "BP" => Ok(Self::Bp),
            "PPK" => Ok(Self::Ppk),
            "PPD" => Ok(Self::Ppd),
            "ADK" => Ok(Self::Adk),
            "KSBU" => Ok(Self::Ksbu),
            "PABPD" => Ok(Self::Pabpd),
            _ => Err(format!("Invalid employee role: {s}")),
        }
    }
}

impl TryFrom<String> for EmployeeRole {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// System-level role of the caller, orthogonal to the employee role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SystemRole {
    Admin,
    Supervisor,
    Employee,
}

impl fmt::Display for SystemRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Admin => write!(f, "admin"),
            Self::Supervisor => write!(f, "supervisor"),
            Self::Employee => write!(f, "employee"),
        }
    }
}

impl std::str::FromStr for SystemRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "admin" => Ok(Self::Admin),
            "supervisor" => Ok(Self::Supervisor),
            "employee" => Ok(Self::Employee),
            _ => Err(format!("Invalid system role: {s}")),
        }
    }
}

/// Already-authenticated caller context.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Actor {
    pub id: Uuid,
    pub name: String,
    pub system_role: SystemRole,
    pub employee_role: Option<EmployeeRole>,
}

impl Actor {
    pub fn is_admin(&self) -> bool {
        self.system_role == SystemRole::Admin
    }

    pub fn is_employee(&self) -> bool {
        self.system_role == SystemRole::Employee
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_codes_round_trip() {
        for role in [
            EmployeeRole::Ver,
            EmployeeRole::Pprbpd,
            EmployeeRole::Ok,
            EmployeeRole::Ospm,
            EmployeeRole::Op,
            EmployeeRole::Ospby,
            EmployeeRole::Bp,
            EmployeeRole::Ppk,
            EmployeeRole::Ppd,
            EmployeeRole::Adk,
            EmployeeRole::Ksbu,
            EmployeeRole::Pabpd,
        ] {
            assert_eq!(role.to_string().parse::<EmployeeRole>().unwrap(), role);
        }
    }

    #[test]
    fn mixed_case_spby_code_is_preserved() {
        assert_eq!(EmployeeRole::Ospby.to_string(), "OSPBy");
        assert!("OSPBY".parse::<EmployeeRole>().is_err());
    }

    #[test]
    fn only_ppd_is_designated_executor() {
        assert!(EmployeeRole::Ppd.is_designated_executor());
        assert!(!EmployeeRole::Ver.is_designated_executor());
    }
}
