#![allow(dead_code)]

use fifo_orderbook::instruction::{create_market, register_trader};
use fifo_orderbook::market::{Market, MarketAccounts};
use fifo_orderbook::state::critbit::Slab;
use fifo_orderbook::state::event_queue::EventQueue;
use fifo_orderbook::state::market_state::MarketState;
use solana_program::instruction::Instruction;
use solana_program::pubkey::Pubkey;
use solana_program::system_instruction::create_account;
use solana_program_test::{BanksClientError, ProgramTestContext};
use solana_sdk::signature::Signer;
use solana_sdk::{signature::Keypair, transaction::Transaction};

pub const MARKET_ADDRESS: [u8; 32] = [9; 32];

pub fn trader(n: u8) -> [u8; 32] {
    [n; 32]
}

/// Owned buffers of a market, for running the engine without a validator.
pub struct MarketFixture {
    pub market: Vec<u8>,
    pub bids: Vec<u8>,
    pub asks: Vec<u8>,
    pub event_queue: Vec<u8>,
}

impl MarketFixture {
    /// A market where one tick is one quote lot per base lot.
    pub fn new(num_seats: usize, num_orders: usize, num_events: usize) -> Self {
        Self::with_parameters(num_seats, num_orders, num_events, 1, 1)
    }

    pub fn with_parameters(
        num_seats: usize,
        num_orders: usize,
        num_events: usize,
        base_lots_per_base_unit: u64,
        tick_size_in_quote_lots_per_base_unit: u64,
    ) -> Self {
        let mut fixture = Self {
            market: vec![0; MarketState::compute_allocation_size(num_seats)],
            bids: vec![0; Slab::compute_allocation_size(num_orders)],
            asks: vec![0; Slab::compute_allocation_size(num_orders)],
            event_queue: vec![0; EventQueue::compute_allocation_size(num_events)],
        };
        fixture
            .accounts()
            .initialize(
                MARKET_ADDRESS,
                MarketState::new(
                    [1; 32],
                    [2; 32],
                    [3; 32],
                    [4; 32],
                    base_lots_per_base_unit,
                    tick_size_in_quote_lots_per_base_unit,
                ),
            )
            .unwrap();
        fixture
    }

    pub fn accounts(&mut self) -> MarketAccounts<'_> {
        MarketAccounts::new(
            &mut self.market,
            &mut self.bids,
            &mut self.asks,
            &mut self.event_queue,
        )
    }

    pub fn with_market<R>(&mut self, f: impl FnOnce(&mut Market<'_>, &mut EventQueue<'_>) -> R) -> R {
        let mut accounts = self.accounts();
        let (mut market, mut event_queue) = accounts.load().unwrap();
        f(&mut market, &mut event_queue)
    }

    /// Registers a trader and credits its seat.
    pub fn seat(&mut self, trader: &[u8; 32], quote_lots: u64, base_lots: u64) -> u64 {
        self.with_market(|market, _| {
            let trader_index = market.register_trader(trader).unwrap();
            market.deposit_funds(trader, quote_lots, base_lots).unwrap();
            trader_index
        })
    }

    /// Pops every pending event.
    pub fn drain_events(&mut self) -> Vec<fifo_orderbook::state::event_queue::MarketEvent> {
        self.with_market(|_, event_queue| {
            let events = event_queue.iter().collect::<Vec<_>>();
            event_queue.pop_n(events.len() as u64);
            events
        })
    }

    pub fn bytes(&self) -> Vec<u8> {
        [
            &self.market[..],
            &self.bids[..],
            &self.asks[..],
            &self.event_queue[..],
        ]
        .concat()
    }
}

/// Creates the accounts needed for a market, initializes it and returns the market, event queue,
/// bids and asks addresses.
pub async fn create_market_and_accounts(
    prg_test_ctx: &mut ProgramTestContext,
    program_id: Pubkey,
    caller_authority: &Keypair,
) -> [Pubkey; 4] {
    let sizes = [
        MarketState::compute_allocation_size(16),
        EventQueue::compute_allocation_size(128),
        Slab::compute_allocation_size(64),
        Slab::compute_allocation_size(64),
    ];
    let rent = prg_test_ctx.banks_client.get_rent().await.unwrap();
    let mut keys = [Pubkey::default(); 4];
    for (key, space) in keys.iter_mut().zip(sizes) {
        let account = Keypair::new();
        let create_account_instruction = create_account(
            &prg_test_ctx.payer.pubkey(),
            &account.pubkey(),
            rent.minimum_balance(space),
            space as u64,
            &program_id,
        );
        sign_send_instructions(
            prg_test_ctx,
            vec![create_account_instruction],
            vec![&account],
        )
        .await
        .unwrap();
        *key = account.pubkey();
    }

    let [market, event_queue, bids, asks] = keys;
    let create_market_instruction = create_market(
        program_id,
        create_market::Accounts {
            market: &market,
            event_queue: &event_queue,
            bids: &bids,
            asks: &asks,
        },
        create_market::Params {
            caller_authority: caller_authority.pubkey(),
            base_lots_per_base_unit: 1,
            tick_size_in_quote_lots_per_base_unit: 1,
        },
    );
    sign_send_instructions(prg_test_ctx, vec![create_market_instruction], vec![])
        .await
        .unwrap();

    keys
}

pub async fn register(
    prg_test_ctx: &mut ProgramTestContext,
    program_id: Pubkey,
    market: &Pubkey,
    trader: &Keypair,
) {
    let instruction = register_trader(
        program_id,
        register_trader::Accounts {
            market,
            trader: &trader.pubkey(),
        },
    );
    sign_send_instructions(prg_test_ctx, vec![instruction], vec![trader])
        .await
        .unwrap();
}

// Utils
pub async fn sign_send_instructions(
    ctx: &mut ProgramTestContext,
    instructions: Vec<Instruction>,
    signers: Vec<&Keypair>,
) -> Result<(), BanksClientError> {
    let mut transaction = Transaction::new_with_payer(&instructions, Some(&ctx.payer.pubkey()));
    let mut payer_signers = vec![&ctx.payer];
    for s in signers {
        payer_signers.push(s);
    }
    transaction.partial_sign(&payer_signers, ctx.last_blockhash);
    ctx.banks_client.process_transaction(transaction).await
}
