// Resource module
// Ordered list of grid columns (staff members, rooms, chairs...)

use crate::models::appointment::Appointment;

/// The ordered, fixed set of columns shown by one grid instance.
///
/// The index of a name is the column identity used by geometry and picking.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceList {
    names: Vec<String>,
}

impl ResourceList {
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            names: names.into_iter().map(Into::into).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn name(&self, index: usize) -> Option<&str> {
        self.names.get(index).map(String::as_str)
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// Exact (case-insensitive) column lookup.
    pub fn position(&self, name: &str) -> Option<usize> {
        self.names.iter().position(|n| n.eq_ignore_ascii_case(name))
    }

    /// Column lookup that never fails: unknown names land in the last column.
    pub fn index_of(&self, name: &str) -> usize {
        self.position(name).unwrap_or_else(|| self.last_index())
    }

    /// Column an appointment is drawn in.
    pub fn column_for(&self, appointment: &Appointment) -> usize {
        match appointment.resource.as_deref() {
            Some(resource) => self.index_of(resource),
            None => title_match::column_from_title(self, appointment),
        }
    }

    pub fn last_index(&self) -> usize {
        self.names.len().saturating_sub(1)
    }
}

/// Compatibility shim for legacy appointment data that carries no resource
/// field and instead stores the owning resource's name as its title.
pub mod title_match {
    use super::ResourceList;
    use crate::models::appointment::Appointment;

    pub fn column_from_title(resources: &ResourceList, appointment: &Appointment) -> usize {
        resources.index_of(appointment.title.trim())
    }

    /// Fills in `resource` from the title when it matches a known column.
    /// Appointments that already name a resource are left alone.
    pub fn assign_from_title(resources: &ResourceList, appointment: &mut Appointment) {
        if appointment.resource.is_some() {
            return;
        }
        if let Some(index) = resources.position(appointment.title.trim()) {
            appointment.resource = resources.name(index).map(str::to_string);
        }
    }
}
