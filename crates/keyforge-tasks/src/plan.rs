//! Build plan: merged tasks grouped so each group needs one checkout

use std::collections::HashMap;

use serde::Serialize;

use keyforge_core::{ForkFamily, GroupKey, KeyboardTask};

/// Tasks sharing one group key
#[derive(Debug, Clone, Serialize)]
pub struct PlanGroup {
    /// Group key
    pub key: GroupKey,
    /// Ref checked out for this group
    pub checkout: String,
    /// Tasks in input order
    pub tasks: Vec<KeyboardTask>,
}

/// Ordered list of build tasks for one run
#[derive(Debug, Clone, Serialize)]
pub struct BuildPlan {
    family: ForkFamily,
    groups: Vec<PlanGroup>,
}

impl BuildPlan {
    /// Group merged tasks.
    ///
    /// The home group comes first (the tree starts there), then the other
    /// groups in order of first appearance. Order inside a group is kept.
    pub fn new(tasks: Vec<KeyboardTask>, family: ForkFamily) -> Self {
        let home = family.home();
        let mut groups: Vec<PlanGroup> = Vec::new();
        let mut index: HashMap<GroupKey, usize> = HashMap::new();

        for task in tasks {
            let key = task.group_key(family);
            let pos = match index.get(&key) {
                Some(&pos) => pos,
                None => {
                    groups.push(PlanGroup {
                        key: key.clone(),
                        checkout: task.target.checkout_target(family),
                        tasks: Vec::new(),
                    });
                    index.insert(key, groups.len() - 1);
                    groups.len() - 1
                }
            };
            groups[pos].tasks.push(task);
        }

        // stable: only moves the home group to the front
        groups.sort_by_key(|g| g.key != home);

        Self { family, groups }
    }

    pub fn family(&self) -> ForkFamily {
        self.family
    }

    pub fn groups(&self) -> &[PlanGroup] {
        &self.groups
    }

    /// Tasks in execution order
    pub fn tasks(&self) -> impl Iterator<Item = &KeyboardTask> {
        self.groups.iter().flat_map(|g| g.tasks.iter())
    }

    /// Number of tasks
    pub fn len(&self) -> usize {
        self.groups.iter().map(|g| g.tasks.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of (keyboard, keymap) compiles the plan asks for
    pub fn keymap_count(&self) -> usize {
        self.tasks().map(|t| t.keymaps.len()).sum()
    }

    /// Human-readable rendering of the plan
    pub fn execution_plan(&self) -> String {
        let mut plan = String::new();
        for (i, group) in self.groups.iter().enumerate() {
            plan.push_str(&format!(
                "Group {} {} ({} tasks, checkout {}):\n",
                i,
                group.key,
                group.tasks.len(),
                group.checkout
            ));
            for task in &group.tasks {
                let marker = if task.auto_detected { " (detected)" } else { "" };
                plan.push_str(&format!(
                    "  {} -> {}{}\n",
                    task.keyboard,
                    task.keymaps.join(", "),
                    marker
                ));
            }
        }
        plan
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use keyforge_core::ForkReference;

    fn fork(user: &str) -> ForkReference {
        ForkReference::resolve(user, None, None, ForkFamily::Qmk)
    }

    #[test]
    fn test_groups_are_contiguous_with_home_first() {
        let tasks = vec![
            KeyboardTask::new("a", ["default"]).with_fork(fork("x")),
            KeyboardTask::new("b", ["default"]),
            KeyboardTask::new("c", ["default"]).with_fork(fork("y")),
            KeyboardTask::new("d", ["default"]).with_fork(fork("x")),
            KeyboardTask::new("e", ["default"]),
        ];
        let plan = BuildPlan::new(tasks, ForkFamily::Qmk);

        let order: Vec<&str> = plan.tasks().map(|t| t.keyboard.as_str()).collect();
        assert_eq!(order, vec!["b", "e", "a", "d", "c"]);

        let keys: Vec<&str> = plan.groups().iter().map(|g| g.key.as_str()).collect();
        assert_eq!(
            keys,
            vec![
                "qmk-qmk_firmware-master",
                "x-qmk_firmware-master",
                "y-qmk_firmware-master"
            ]
        );
        assert_eq!(plan.groups()[0].checkout, "master");
        assert_eq!(plan.groups()[1].checkout, "x_qmk_firmware/master");
    }

    #[test]
    fn test_counts() {
        let plan = BuildPlan::new(
            vec![
                KeyboardTask::new("a", ["default", "via"]),
                KeyboardTask::new("b", ["default"]),
            ],
            ForkFamily::Qmk,
        );
        assert_eq!(plan.len(), 2);
        assert_eq!(plan.keymap_count(), 3);
        assert!(!plan.is_empty());
        assert!(BuildPlan::new(vec![], ForkFamily::Qmk).is_empty());
    }

    #[test]
    fn test_execution_plan_text() {
        let plan = BuildPlan::new(
            vec![KeyboardTask::new("a", ["via"]).detected()],
            ForkFamily::Vial,
        );
        let text = plan.execution_plan();
        assert!(text.contains("vial-kb-vial-qmk-vial"));
        assert!(text.contains("a -> via (detected)"));
    }
}
