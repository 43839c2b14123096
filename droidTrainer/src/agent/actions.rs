use std::fmt;

/// Number of discrete actions in the gameplay action table.
pub const ACTION_COUNT: usize = 20;

/// Discrete control vocabulary for the droid.
///
/// Declaration order fixes the class index used by the policy head, so the
/// variants must stay aligned with the game's action table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DroidAction {
    NoOp,
    MoveUp,
    MoveDown,
    MoveLeft,
    MoveRight,
    RotateLeft,
    RotateRight,
    ShootPrimary,
    ShootMissile,
    ShootLaser,
    ActivateTractor,
    AssignCrewShields,
    AssignCrewEngineering,
    AssignCrewWeapons,
    AssignCrewNavigation,
    UnassignCrew,
    SelectUpgradeHealth,
    SelectUpgradeShields,
    SelectUpgradeAlly,
    SelectUpgradeCargoAlly,
}

impl DroidAction {
    /// All actions in class-index order.
    pub const ALL: [DroidAction; ACTION_COUNT] = [
        DroidAction::NoOp,
        DroidAction::MoveUp,
        DroidAction::MoveDown,
        DroidAction::MoveLeft,
        DroidAction::MoveRight,
        DroidAction::RotateLeft,
        DroidAction::RotateRight,
        DroidAction::ShootPrimary,
        DroidAction::ShootMissile,
        DroidAction::ShootLaser,
        DroidAction::ActivateTractor,
        DroidAction::AssignCrewShields,
        DroidAction::AssignCrewEngineering,
        DroidAction::AssignCrewWeapons,
        DroidAction::AssignCrewNavigation,
        DroidAction::UnassignCrew,
        DroidAction::SelectUpgradeHealth,
        DroidAction::SelectUpgradeShields,
        DroidAction::SelectUpgradeAlly,
        DroidAction::SelectUpgradeCargoAlly,
    ];

    /// Class index of this action in the policy output.
    pub fn index(&self) -> usize {
        *self as usize
    }

    /// Maps a class index back to its action, if in range.
    pub fn from_index(index: usize) -> Option<DroidAction> {
        DroidAction::ALL.get(index).copied()
    }
}

impl fmt::Display for DroidAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DroidAction::NoOp => "NO_OP",
            DroidAction::MoveUp => "MOVE_UP",
            DroidAction::MoveDown => "MOVE_DOWN",
            DroidAction::MoveLeft => "MOVE_LEFT",
            DroidAction::MoveRight => "MOVE_RIGHT",
            DroidAction::RotateLeft => "ROTATE_LEFT",
            DroidAction::RotateRight => "ROTATE_RIGHT",
            DroidAction::ShootPrimary => "SHOOT_PRIMARY",
            DroidAction::ShootMissile => "SHOOT_MISSILE",
            DroidAction::ShootLaser => "SHOOT_LASER",
            DroidAction::ActivateTractor => "ACTIVATE_TRACTOR",
            DroidAction::AssignCrewShields => "ASSIGN_CREW_SHIELDS",
            DroidAction::AssignCrewEngineering => "ASSIGN_CREW_ENGINEERING",
            DroidAction::AssignCrewWeapons => "ASSIGN_CREW_WEAPONS",
            DroidAction::AssignCrewNavigation => "ASSIGN_CREW_NAVIGATION",
            DroidAction::UnassignCrew => "UNASSIGN_CREW",
            DroidAction::SelectUpgradeHealth => "SELECT_UPGRADE_HEALTH",
            DroidAction::SelectUpgradeShields => "SELECT_UPGRADE_SHIELDS",
            DroidAction::SelectUpgradeAlly => "SELECT_UPGRADE_ALLY",
            DroidAction::SelectUpgradeCargoAlly => "SELECT_UPGRADE_CARGO_ALLY",
        };
        write!(f, "{}", name)
    }
}
