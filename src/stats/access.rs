//! Who may manage an athlete's statistics.

use crate::roster::{Actor, Athlete, Role};
use crate::stats::StatsError;

/// Administrators may manage anyone; a coach only the athletes assigned to them.
pub fn can_manage(actor: &Actor, athlete: &Athlete) -> bool {
    match actor.role() {
        Role::Administrator => true,
        Role::Coach => match (&actor.coach, athlete.coach_id) {
            (Some(coach), Some(assigned)) => coach.id == assigned,
            _ => false,
        },
        Role::Athlete => false,
    }
}

/// Gate a stats request: the athlete must have a team, then the actor must
/// be allowed to manage them. The team check takes precedence.
pub fn authorize(actor: &Actor, athlete: &Athlete) -> Result<uuid::Uuid, StatsError> {
    let Some(team_id) = athlete.team_id else {
        return Err(StatsError::NoTeam);
    };

    if !can_manage(actor, athlete) {
        tracing::warn!(
            actor = %actor.user.username,
            athlete = %athlete.id,
            "Rejected statistics access"
        );
        return Err(StatsError::Unauthorized);
    }

    Ok(team_id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::roster::{Coach, User};
    use uuid::Uuid;

    fn actor(role: Role, coach_id: Option<Uuid>) -> Actor {
        let user = User::new("u".to_string(), "u@club.org".to_string(), role);
        let coach = coach_id.map(|id| Coach {
            id,
            user_id: user.id,
            team_id: None,
        });
        Actor {
            user,
            coach,
            athlete: None,
        }
    }

    fn athlete(team: bool, coach_id: Option<Uuid>) -> Athlete {
        let mut athlete = Athlete::new(Uuid::new_v4());
        athlete.team_id = team.then(Uuid::new_v4);
        athlete.coach_id = coach_id;
        athlete
    }

    #[test]
    fn test_can_manage_truth_table() {
        let assigned = Uuid::new_v4();
        let other = Uuid::new_v4();
        let target = athlete(true, Some(assigned));

        assert!(can_manage(&actor(Role::Administrator, None), &target));
        assert!(can_manage(&actor(Role::Coach, Some(assigned)), &target));
        assert!(!can_manage(&actor(Role::Coach, Some(other)), &target));
        assert!(!can_manage(&actor(Role::Coach, None), &target));
        assert!(!can_manage(&actor(Role::Athlete, None), &target));
        // A coach profile alone does not grant access under another role
        assert!(!can_manage(&actor(Role::Athlete, Some(assigned)), &target));
        assert!(!can_manage(&actor(Role::Coach, Some(assigned)), &athlete(true, None)));
    }

    #[test]
    fn test_missing_team_takes_precedence() {
        let admin = actor(Role::Administrator, None);
        let stranger = actor(Role::Athlete, None);
        let teamless = athlete(false, None);

        assert!(matches!(authorize(&admin, &teamless), Err(StatsError::NoTeam)));
        assert!(matches!(authorize(&stranger, &teamless), Err(StatsError::NoTeam)));
    }

    #[test]
    fn test_authorize_returns_team() {
        let coach_id = Uuid::new_v4();
        let target = athlete(true, Some(coach_id));
        let team = authorize(&actor(Role::Coach, Some(coach_id)), &target).unwrap();
        assert_eq!(Some(team), target.team_id);
        assert!(matches!(
            authorize(&actor(Role::Athlete, None), &target),
            Err(StatsError::Unauthorized)
        ));
    }
}
