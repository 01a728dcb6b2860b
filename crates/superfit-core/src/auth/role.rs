//! Role-based landing page selection.
//!
//! Routing on the decoded role is a convenience for the user. It is not an
//! access control: the server checks the role on every request.

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    Admin,
    Gestor,
    Professor,
    Aluno,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "ROLE_ADMIN",
            Role::Gestor => "ROLE_GESTOR",
            Role::Professor => "ROLE_PROFESSOR",
            Role::Aluno => "ROLE_ALUNO",
        }
    }

    pub fn landing(&self) -> Destination {
        match self {
            Role::Admin => Destination::AdminDashboard,
            Role::Gestor => Destination::GestorDashboard,
            Role::Professor => Destination::ProfessorDashboard,
            Role::Aluno => Destination::AlunoDashboard,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown role: {0}")]
pub struct UnknownRole(pub String);

impl FromStr for Role {
    type Err = UnknownRole;

    /// Exact, case-sensitive match on the claim value.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ROLE_ADMIN" => Ok(Role::Admin),
            "ROLE_GESTOR" => Ok(Role::Gestor),
            "ROLE_PROFESSOR" => Ok(Role::Professor),
            "ROLE_ALUNO" => Ok(Role::Aluno),
            other => Err(UnknownRole(other.to_string())),
        }
    }
}

/// Landing pages a login can redirect to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Destination {
    AdminDashboard,
    GestorDashboard,
    ProfessorDashboard,
    AlunoDashboard,
    Home,
}

impl Destination {
    pub fn path(&self) -> &'static str {
        match self {
            Destination::AdminDashboard => "/admin/dashboard",
            Destination::GestorDashboard => "/gestor/dashboard",
            Destination::ProfessorDashboard => "/professor/dashboard",
            Destination::AlunoDashboard => "/aluno/dashboard",
            Destination::Home => "/home",
        }
    }
}

impl fmt::Display for Destination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.path())
    }
}

/// Map a decoded role claim to its landing page. Unknown or absent roles go home.
pub fn route(role: Option<&str>) -> Destination {
    role.and_then(|r| r.parse::<Role>().ok())
        .map(|r| r.landing())
        .unwrap_or(Destination::Home)
}
