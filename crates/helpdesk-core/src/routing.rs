//! Category → support group routing.

use std::collections::BTreeMap;

use crate::model::{Category, SupportGroup};

/// Built-in category → group table.
#[must_use]
pub fn builtin_groups() -> BTreeMap<Category, SupportGroup> {
    [
        (Category::SOFTWARE_INSTALL, SupportGroup::FIRST_LINE),
        (Category::SOFTWARE_CONFIG, SupportGroup::FIRST_LINE),
        (Category::HARDWARE, SupportGroup::FIRST_LINE),
        (Category::INFRASTRUCTURE, SupportGroup::INFRASTRUCTURE_ADMINS),
        (Category::ACCOUNT, SupportGroup::FIRST_LINE),
        (Category::APPLICATIONS, SupportGroup::APPLICATION_ADMINS),
        (Category::OTHER, SupportGroup::FIRST_LINE),
        (Category::UNASSIGNED, SupportGroup::FIRST_LINE),
    ]
    .into_iter()
    .map(|(category, group)| (Category::new(category), SupportGroup::new(group)))
    .collect()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryRouter {
    groups: BTreeMap<Category, SupportGroup>,
    default_group: SupportGroup,
}

impl Default for CategoryRouter {
    fn default() -> Self {
        Self::new(builtin_groups(), SupportGroup::first_line())
    }
}

impl CategoryRouter {
    #[must_use]
    pub const fn new(
        groups: BTreeMap<Category, SupportGroup>,
        default_group: SupportGroup,
    ) -> Self {
        Self {
            groups,
            default_group,
        }
    }

    #[must_use]
    pub const fn groups(&self) -> &BTreeMap<Category, SupportGroup> {
        &self.groups
    }

    #[must_use]
    pub const fn default_group(&self) -> &SupportGroup {
        &self.default_group
    }

    /// Group owning tickets of `category`; unknown categories go to the
    /// default group.
    #[must_use]
    pub fn group_for(&self, category: &Category) -> &SupportGroup {
        self.groups.get(category).unwrap_or(&self.default_group)
    }
}
