//! Sample batch for the recalculation run.

use employer_incentives_core::calendar::CollectionCalendar;
use employer_incentives_core::{AccountRef, EmployerType};
use employer_incentives_runtime::CalculateEarningsCommand;
use employer_incentives_testing::InMemoryIncentiveRepository;
use employer_incentives_testing::fixtures::{IncentiveBuilder, date, monthly_calendar};

/// Monthly periods for academic years 2021 and 2022, collecting January 2021.
pub fn calendar() -> CollectionCalendar {
    monthly_calendar((2021, 1))
}

/// Seeds one incentive per scenario and returns the commands that recalculate them.
pub fn incentives(repository: &InMemoryIncentiveRepository) -> Vec<CalculateEarningsCommand> {
    let batch = [
        // Under 25, levy employer, inside the window
        IncentiveBuilder::new()
            .account(AccountRef::new(1001, 2001))
            .date_of_birth(date(2002, 6, 15))
            .start_date(date(2020, 9, 1)),
        // 25 or over, non-levy employer
        IncentiveBuilder::new()
            .account(AccountRef::new(1002, 2002))
            .date_of_birth(date(1990, 3, 2))
            .start_date(date(2021, 2, 1))
            .employer_type(EmployerType::NonLevy),
        // Starts after the window closes: no earnings
        IncentiveBuilder::new()
            .account(AccountRef::new(1003, 2003))
            .start_date(date(2021, 6, 1)),
    ];

    batch
        .into_iter()
        .map(|builder| {
            let incentive = builder.build();
            let command = CalculateEarningsCommand {
                apprenticeship_incentive_id: incentive.id(),
                account_id: incentive.account().id,
                apprenticeship_id: incentive.apprenticeship().id,
            };
            repository.seed(incentive);
            command
        })
        .collect()
}
