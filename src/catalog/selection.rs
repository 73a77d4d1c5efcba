//! Group selection syntax: `ALL`, `28`, `10-50` (half-open), `1,8,13`

use std::str::FromStr;

use super::CatalogError;

/// Which groups of a corpus to build
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GroupSelection {
    All,
    /// Half-open range `start..end`
    Range(usize, usize),
    List(Vec<usize>),
}

impl FromStr for GroupSelection {
    type Err = CatalogError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let invalid = || CatalogError::InvalidSelection(s.to_string());
        let number = |part: &str| part.trim().parse::<usize>().map_err(|_| invalid());

        if s.eq_ignore_ascii_case("ALL") {
            return Ok(Self::All);
        }
        if s.contains(',') {
            return s.split(',').map(number).collect::<Result<_, _>>().map(Self::List);
        }
        if let Some((start, end)) = s.split_once('-') {
            return Ok(Self::Range(number(start)?, number(end)?));
        }
        Ok(Self::List(vec![number(s)?]))
    }
}

impl GroupSelection {
    /// Concrete group indices for a corpus of `available` groups
    pub fn resolve(&self, available: usize) -> Result<Vec<usize>, CatalogError> {
        let groups: Vec<usize> = match self {
            Self::All => (0..available).collect(),
            Self::Range(start, end) => (*start..*end).collect(),
            Self::List(list) => list.clone(),
        };
        if let Some(&group) = groups.iter().find(|&&g| g >= available) {
            return Err(CatalogError::GroupOutOfRange { group, available });
        }
        Ok(groups)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_forms() {
        assert_eq!("ALL".parse::<GroupSelection>().unwrap(), GroupSelection::All);
        assert_eq!("28".parse::<GroupSelection>().unwrap(), GroupSelection::List(vec![28]));
        assert_eq!("10-50".parse::<GroupSelection>().unwrap(), GroupSelection::Range(10, 50));
        assert_eq!(
            "1,8,13".parse::<GroupSelection>().unwrap(),
            GroupSelection::List(vec![1, 8, 13])
        );
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(matches!(
            "seven".parse::<GroupSelection>(),
            Err(CatalogError::InvalidSelection(_))
        ));
        assert!("1,x".parse::<GroupSelection>().is_err());
    }

    #[test]
    fn test_range_is_half_open() {
        let groups = GroupSelection::Range(2, 5).resolve(10).unwrap();
        assert_eq!(groups, vec![2, 3, 4]);
    }

    #[test]
    fn test_out_of_range_is_rejected() {
        assert!(matches!(
            GroupSelection::List(vec![3, 12]).resolve(10),
            Err(CatalogError::GroupOutOfRange { group: 12, available: 10 })
        ));
        assert_eq!(GroupSelection::All.resolve(3).unwrap(), vec![0, 1, 2]);
    }
}
